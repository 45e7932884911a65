//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::Config;

/// Strata command-line arguments.
///
/// Global options override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "strata", about = "Preprocess 3D models into cached LOD buffers", version)]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides the configured one).
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Neither read nor write the geometry cache.
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Process model files into LOD buffers, using the cache when possible.
    Process {
        /// Model files to process.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print statistics and per-object summaries of a model file.
    Inspect {
        /// Model file to inspect.
        file: PathBuf,
    },
    /// Inspect or maintain the geometry cache.
    Cache {
        /// Cache operation.
        #[command(subcommand)]
        action: CacheCommand,
    },
}

/// Cache maintenance subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CacheCommand {
    /// Show entry count, total size and location.
    Stats,
    /// Forget one file, or everything when no file is given.
    Clear {
        /// Source file whose entry should be removed.
        file: Option<PathBuf>,
    },
    /// Evict old entries and enforce the size budget.
    Cleanup {
        /// Maximum age in days (defaults to the configured value).
        #[arg(long)]
        max_age_days: Option<f64>,
        /// Size budget in megabytes (defaults to the configured value).
        #[arg(long)]
        max_size_mb: Option<f64>,
    },
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.cache_dir {
            self.cache.directory = Some(dir.clone());
        }
        if args.no_cache {
            self.cache.enabled = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
