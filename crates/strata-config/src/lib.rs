//! Configuration for the Strata model preprocessor.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Missing sections and unknown fields are tolerated so older
//! and newer config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::{CacheCommand, CliArgs, Command};
pub use config::{CONFIG_FILE_NAME, CacheConfig, Config, DebugConfig};
pub use error::ConfigError;
