//! The path → entry index document.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Bookkeeping for one indexed source path.
///
/// Timestamps are Unix seconds. Missing numeric fields in an older index
/// default to zero instead of invalidating the whole document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheIndexEntry {
    /// Lowercase hex SHA-256 of the source file's bytes.
    pub hash: String,
    /// Base name of the source file when it was indexed.
    #[serde(default)]
    pub original_name: String,
    /// When the entry was created.
    #[serde(default)]
    pub cached_at: f64,
    /// When the payload was last loaded through this path.
    #[serde(default)]
    pub last_accessed: f64,
    /// Seconds spent processing the source on the run that produced the blob.
    #[serde(default)]
    pub processing_time: f64,
    /// Size of the payload blob in megabytes.
    #[serde(default)]
    pub cache_size_mb: f64,
}

/// Mapping from source path to [`CacheIndexEntry`], persisted as one JSON
/// object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex {
    entries: BTreeMap<String, CacheIndexEntry>,
}

impl CacheIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the index at `path`.
    ///
    /// A missing file yields an empty index. Unreadable or unparsable files
    /// are errors; the cache decides how to recover from them.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// Rewrites the whole index at `path` through a sibling temp file, so a
    /// crash mid-write leaves the previous document intact.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Returns the entry for `key`.
    pub fn get(&self, key: &str) -> Option<&CacheIndexEntry> {
        self.entries.get(key)
    }

    /// Returns a mutable reference to the entry for `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheIndexEntry> {
        self.entries.get_mut(key)
    }

    /// Inserts or replaces the entry for `key`, returning the previous one.
    pub fn insert(&mut self, key: String, entry: CacheIndexEntry) -> Option<CacheIndexEntry> {
        self.entries.insert(key, entry)
    }

    /// Removes the entry for `key`.
    pub fn remove(&mut self, key: &str) -> Option<CacheIndexEntry> {
        self.entries.remove(key)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over `(path, entry)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheIndexEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of indexed paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no path is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any indexed path still points at `hash`.
    pub fn references(&self, hash: &str) -> bool {
        self.entries.values().any(|e| e.hash == hash)
    }
}
