//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Geometry cache settings.
    pub cache: CacheConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Geometry cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the cache at all. When off every model is reprocessed and nothing
    /// is written.
    pub enabled: bool,
    /// Cache directory. `None` selects the platform cache directory.
    pub directory: Option<PathBuf>,
    /// Entries not accessed for this many days are evicted by cleanup.
    pub max_age_days: f64,
    /// Total payload budget in megabytes enforced by cleanup.
    pub max_size_mb: f64,
    /// Run cleanup once when the cache is opened.
    pub cleanup_on_start: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            max_age_days: 30.0,
            max_size_mb: 1000.0,
            cleanup_on_start: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE_NAME), serialized)
            .map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-reads the file: returns `Some(new_config)` if it changed, `None`
    /// otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE_NAME))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Checks value ranges that the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = &self.cache;
        if cache.max_age_days.is_nan() || cache.max_age_days < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_age_days",
                reason: format!("{} is not a non-negative number", cache.max_age_days),
            });
        }
        if cache.max_size_mb.is_nan() || cache.max_size_mb < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_size_mb",
                reason: format!("{} is not a non-negative number", cache.max_size_mb),
            });
        }
        // An env-filter style directive (e.g. "strata_cache=debug") is also
        // accepted, so only bare level names are checked.
        let level = self.debug.log_level.trim();
        if !level.contains(['=', ',']) && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            return Err(ConfigError::InvalidValue {
                field: "debug.log_level",
                reason: format!("unknown level {level:?}"),
            });
        }
        Ok(())
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(config_path).map_err(|source| ConfigError::ReadError {
                path: config_path.to_path_buf(),
                source,
            })?;
        let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("max_age_days: 30.0"));
        assert!(ron_str.contains("log_level: \"info\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.cache.directory = Some(PathBuf::from("/tmp/strata-cache"));
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(debug: (log_level: \"warn\"))").unwrap();
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.debug.log_level, "warn");
    }

    #[test]
    fn test_missing_field_uses_default() {
        let config: Config = ron::from_str("(cache: (max_size_mb: 250.0))").unwrap();
        assert_eq!(config.cache.max_size_mb, 250.0);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_age_days, 30.0);
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.enabled = false;
        config.cache.max_age_days = 7.0;
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("nested");
        let config = Config::load_or_create(&config_dir).unwrap();
        assert_eq!(config, Config::default());
        assert!(config_dir.join(CONFIG_FILE_NAME).is_file());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.cache.max_size_mb = 64.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.cache.max_size_mb), Some(64.0));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_budgets() {
        let mut config = Config::default();
        config.cache.max_size_mb = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "cache.max_size_mb",
                ..
            })
        ));

        let mut config = Config::default();
        config.cache.max_age_days = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.debug.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());
        config.debug.log_level = "strata_cache=debug,info".to_string();
        assert!(config.validate().is_ok());
        config.debug.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ron_comments_accepted() {
        let ron_str = "// cache settings\n(\n  // nothing overridden\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
