//! Cache error types.

use std::path::PathBuf;

use crate::payload::PayloadError;

/// Errors raised by cache mutations. Queries never surface these; they log
/// and report a miss instead.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the cache directory failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The index document could not be serialized or parsed.
    #[error("cache index error: {0}")]
    Index(#[from] serde_json::Error),

    /// A payload blob could not be encoded or decoded.
    #[error("cache payload error: {0}")]
    Payload(#[from] PayloadError),

    /// The source file could not be read to compute its content hash.
    #[error("failed to hash {path}: {source}")]
    Unhashable {
        /// Source file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source file changed between fetching and storing its payload.
    #[error("{path} changed while it was being processed")]
    SourceChanged {
        /// Source file path.
        path: PathBuf,
    },
}
