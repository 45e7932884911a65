//! Parse error types.

use std::path::PathBuf;

/// Errors that abort parsing of a model file. No partial model is returned.
#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    /// The file is missing or unreadable.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid UTF-8.
    #[error("{path} is not valid UTF-8")]
    Encoding {
        /// Path that was being read.
        path: PathBuf,
    },

    /// A coordinate or index token is not a number.
    #[error("line {line}: malformed number {token:?}")]
    MalformedNumber {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },

    /// A face corner does not match `v`, `v/t`, `v//n` or `v/t/n`.
    #[error("line {line}: malformed face corner {token:?}")]
    MalformedFaceRef {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
}
