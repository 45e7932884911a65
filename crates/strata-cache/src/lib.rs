//! Content-addressed on-disk cache for preprocessed model geometry.
//!
//! Payload blobs are keyed by the SHA-256 of the source file's bytes, so
//! renamed or copied files share one blob and edited files miss. A small
//! JSON index maps each source path to its hash and bookkeeping data and is
//! rewritten after every mutation. The cache is purely an optimisation:
//! every read failure degrades to a miss.

mod cache;
mod error;
mod hash;
mod index;
pub mod payload;

pub use cache::{
    BLOB_EXTENSION, CacheFetch, CacheLookup, CacheStats, GeometryCache, INDEX_FILE_NAME,
    PendingSave, SaveOutcome,
};
pub use error::CacheError;
pub use hash::{HASH_CHUNK_SIZE, content_hash};
pub use index::{CacheIndex, CacheIndexEntry};
pub use payload::{CachedModel, IsolatedObject, ObjectLods, PayloadError};
