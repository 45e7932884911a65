//! Platform directory resolution.
//!
//! Config, cache and log locations follow OS conventions (XDG on Linux,
//! Known Folders on Windows, Library on macOS) under an application
//! directory named [`APP_NAME`].

use std::io;
use std::path::PathBuf;

use strata_config::CacheConfig;

/// Application directory name used under every platform base directory.
pub const APP_NAME: &str = "strata";

/// Errors that can occur during platform operations.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,
    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// OS-specific directory paths for the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Default geometry cache location.
    pub cache_dir: PathBuf,
    /// Log files.
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// Resolve platform-specific directories without creating them on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoConfigDir`] if the OS does not expose a
    /// configuration directory.
    pub fn resolve() -> Result<Self, PlatformError> {
        let app_config = dirs::config_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME);

        let cache_dir = dirs::cache_dir()
            .map(|base| base.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("cache"));

        Ok(Self {
            log_dir: app_config.join("logs"),
            cache_dir,
            config_dir: app_config,
        })
    }

    /// Resolve directories rooted under a custom base path.
    #[cfg(test)]
    fn resolve_with_root(root: &std::path::Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            cache_dir: app_dir.join("cache"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Replaces the config directory, as the `--config` flag does.
    pub fn with_config_dir(mut self, config_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = config_dir {
            self.config_dir = dir;
        }
        self
    }

    /// The cache directory to use for `cache`: its configured directory, or
    /// the platform default.
    pub fn cache_dir_for(&self, cache: &CacheConfig) -> PathBuf {
        cache
            .directory
            .clone()
            .unwrap_or_else(|| self.cache_dir.clone())
    }

    /// Create all directories on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
