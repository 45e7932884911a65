//! The cache handle.
//!
//! Each source file moves through `unknown → hashed → hit | miss`, and a
//! miss becomes `stored` once the caller saves its processed payload. The
//! hash is always recomputed from the file's bytes; the index only records
//! which hash a path had when it was last seen.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::CacheError;
use crate::hash::content_hash;
use crate::index::{CacheIndex, CacheIndexEntry};
use crate::payload::CachedModel;

/// Name of the index document inside the cache directory.
pub const INDEX_FILE_NAME: &str = "cache_index.json";

/// Extension of payload blob files (`<hash>.cache`).
pub const BLOB_EXTENSION: &str = "cache";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// Result of resolving a source path against the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLookup {
    /// The file could not be read, so no hash exists.
    Unknown,
    /// No usable payload exists for the file's current content.
    Miss {
        /// Content hash of the file.
        hash: String,
    },
    /// A payload blob exists for the file's current content.
    Hit {
        /// Content hash of the file.
        hash: String,
    },
}

impl CacheLookup {
    /// Whether the lookup found a payload.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// The computed content hash, if the file could be read.
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Unknown => None,
            Self::Miss { hash } | Self::Hit { hash } => Some(hash),
        }
    }
}

/// What [`GeometryCache::save`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SaveOutcome {
    /// A new payload blob was written.
    Written {
        /// Size of the new blob in megabytes.
        size_mb: f64,
    },
    /// A blob with identical content already existed; only the index entry
    /// was written.
    Aliased,
}

/// Result of [`GeometryCache::fetch`].
#[derive(Debug)]
pub enum CacheFetch {
    /// The payload for the file's current content.
    Hit(CachedModel),
    /// No usable payload; the ticket records the content that was hashed.
    Miss(PendingSave),
    /// The file could not be hashed, so nothing can be cached for it.
    Unavailable,
}

/// Ticket for storing the payload of a missed file under the content hash
/// computed at fetch time.
///
/// Only [`GeometryCache::fetch`] creates one, so a payload is never stored
/// under a hash the cache did not compute itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSave {
    path: PathBuf,
    hash: String,
}

impl PendingSave {
    /// Source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content hash of the source when it was fetched.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Summary of the cache contents.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheStats {
    /// Number of indexed source paths.
    pub total_files: usize,
    /// Sum of the recorded blob sizes over all indexed paths, in megabytes.
    pub total_size_mb: f64,
    /// The cache directory.
    pub cache_dir: PathBuf,
}

/// Content-addressed store of processed model payloads.
///
/// Construct one per process and pass it to whoever needs it. The index is
/// loaded once here and rewritten in full after every mutation. Only one
/// writer per cache directory is supported.
#[derive(Debug)]
pub struct GeometryCache {
    dir: PathBuf,
    index: CacheIndex,
}

impl GeometryCache {
    /// Opens (creating if needed) the cache rooted at `dir`.
    ///
    /// A corrupt or unreadable index is logged and replaced by an empty one;
    /// orphaned blobs stay on disk and are reused when their content shows
    /// up again.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let index = match CacheIndex::load(&dir.join(INDEX_FILE_NAME)) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "could not load cache index, starting empty");
                CacheIndex::new()
            }
        };
        tracing::info!(dir = %dir.display(), entries = index.len(), "opened geometry cache");
        Ok(Self { dir, index })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The in-memory index.
    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    /// Path of the blob for `hash`.
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{BLOB_EXTENSION}"))
    }

    /// Hashes `path` and resolves it against the cache.
    ///
    /// When a blob exists for the hash but the path is not indexed yet, an
    /// alias entry pointing at the existing blob is registered, so copies
    /// and renames of a cached file are never reprocessed. When the path is
    /// indexed under a different hash the file has changed; the stale entry
    /// is left for the next save to overwrite.
    pub fn lookup(&mut self, path: &Path) -> CacheLookup {
        let hash = match content_hash(path) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "could not hash file");
                return CacheLookup::Unknown;
            }
        };

        let blob = self.blob_path(&hash);
        if !blob.is_file() {
            tracing::debug!(path = %path.display(), "cache miss");
            return CacheLookup::Miss { hash };
        }

        let key = entry_key(path);
        match self.index.get(&key) {
            Some(entry) if entry.hash != hash => {
                tracing::debug!(path = %path.display(), "cache entry stale, file modified");
                return CacheLookup::Miss { hash };
            }
            Some(_) => {}
            None => {
                tracing::info!(path = %path.display(), "same content as an existing cache entry, aliasing");
                let entry = new_entry(path, &hash, Duration::ZERO, blob_size_mb(&blob));
                self.index.insert(key, entry);
                if let Err(e) = self.persist_index() {
                    tracing::warn!(error = %e, "could not save cache index");
                }
            }
        }
        CacheLookup::Hit { hash }
    }

    /// Whether a valid payload exists for the current content of `path`.
    pub fn is_cached(&mut self, path: &Path) -> bool {
        self.lookup(path).is_hit()
    }

    /// Loads the payload for `path`, or `None` on a miss or any read or
    /// decode failure.
    pub fn load(&mut self, path: &Path) -> Option<CachedModel> {
        match self.fetch(path) {
            CacheFetch::Hit(model) => Some(model),
            CacheFetch::Miss(_) | CacheFetch::Unavailable => None,
        }
    }

    /// Loads the payload for `path`, or hands back a [`PendingSave`] for
    /// [`store`](Self::store) on a miss.
    ///
    /// A blob that cannot be read or decoded is deleted and reported as a
    /// miss, so the next store replaces it.
    pub fn fetch(&mut self, path: &Path) -> CacheFetch {
        let hash = match self.lookup(path) {
            CacheLookup::Hit { hash } => hash,
            CacheLookup::Miss { hash } => return CacheFetch::Miss(pending(path, hash)),
            CacheLookup::Unknown => return CacheFetch::Unavailable,
        };

        let model = match self.read_blob(&hash) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "rejected cache blob");
                if let Err(e) = self.remove_blob(&hash) {
                    tracing::warn!(hash = %hash, error = %e, "could not delete rejected cache blob");
                }
                return CacheFetch::Miss(pending(path, hash));
            }
        };

        if let Some(entry) = self.index.get_mut(&entry_key(path)) {
            entry.last_accessed = unix_now();
            tracing::info!(
                path = %path.display(),
                saved_secs = entry.processing_time,
                "loaded model from cache"
            );
        }
        if let Err(e) = self.persist_index() {
            tracing::warn!(error = %e, "could not save cache index");
        }
        CacheFetch::Hit(model)
    }

    /// Stores `model` as the payload for the current content of `path`.
    ///
    /// If a blob for that content already exists only the index entry is
    /// written.
    pub fn save(
        &mut self,
        path: &Path,
        model: &CachedModel,
        processing_time: Duration,
    ) -> Result<SaveOutcome, CacheError> {
        let hash = hash_source(path)?;
        self.write_entry(path, &hash, model, processing_time)
    }

    /// Stores `model` for the content hashed by the [`fetch`](Self::fetch)
    /// that produced `pending`.
    ///
    /// Fails with [`CacheError::SourceChanged`] and writes nothing if the
    /// file no longer has that content.
    pub fn store(
        &mut self,
        pending: PendingSave,
        model: &CachedModel,
        processing_time: Duration,
    ) -> Result<SaveOutcome, CacheError> {
        if hash_source(&pending.path)? != pending.hash {
            return Err(CacheError::SourceChanged { path: pending.path });
        }
        self.write_entry(&pending.path, &pending.hash, model, processing_time)
    }

    fn write_entry(
        &mut self,
        path: &Path,
        hash: &str,
        model: &CachedModel,
        processing_time: Duration,
    ) -> Result<SaveOutcome, CacheError> {
        let blob = self.blob_path(hash);

        let outcome = if blob.is_file() {
            tracing::info!(path = %path.display(), "cache blob already exists for this content");
            SaveOutcome::Aliased
        } else {
            let bytes = model.encode()?;
            let tmp = blob.with_extension(format!("{BLOB_EXTENSION}.tmp"));
            fs::write(&tmp, &bytes)?;
            fs::rename(&tmp, &blob)?;
            let size_mb = bytes.len() as f64 / BYTES_PER_MB;
            tracing::info!(path = %path.display(), size_mb, "saved model to cache");
            SaveOutcome::Written { size_mb }
        };

        let entry = new_entry(path, hash, processing_time, blob_size_mb(&blob));
        let previous = self.index.insert(entry_key(path), entry);
        self.persist_index()?;

        // The path used to hold other content; drop that blob once nothing
        // else points at it.
        if let Some(previous) = previous
            && previous.hash != hash
            && !self.index.references(&previous.hash)
        {
            self.remove_blob(&previous.hash)?;
        }
        Ok(outcome)
    }

    fn read_blob(&self, hash: &str) -> Result<CachedModel, CacheError> {
        let bytes = fs::read(self.blob_path(hash))?;
        Ok(CachedModel::decode(&bytes)?)
    }

    /// Deletes the blob for `hash`; a blob that is already gone is fine.
    fn remove_blob(&self, hash: &str) -> io::Result<()> {
        match fs::remove_file(self.blob_path(hash)) {
            Ok(()) => {
                tracing::debug!(hash, "deleted cache blob");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// With a path, forgets that path and deletes its blob once no other
    /// path references it. Without one, deletes every blob and empties the
    /// index.
    pub fn clear(&mut self, path: Option<&Path>) -> Result<(), CacheError> {
        match path {
            Some(path) => self.clear_key(&entry_key(path)).map(|_| ()),
            None => self.clear_all(),
        }
    }

    fn clear_key(&mut self, key: &str) -> Result<bool, CacheError> {
        let Some(entry) = self.index.remove(key) else {
            return Ok(false);
        };

        if !self.index.references(&entry.hash) {
            self.remove_blob(&entry.hash)?;
        }
        self.persist_index()?;
        tracing::info!(path = key, "cache entry cleared");
        Ok(true)
    }

    fn clear_all(&mut self) -> Result<(), CacheError> {
        for dir_entry in fs::read_dir(&self.dir)? {
            let blob = dir_entry?.path();
            if blob.extension().is_some_and(|ext| ext == BLOB_EXTENSION) {
                fs::remove_file(&blob)?;
            }
        }
        self.index.clear();
        self.persist_index()?;
        tracing::info!(dir = %self.dir.display(), "all cache entries cleared");
        Ok(())
    }

    /// Evicts entries that were not accessed for `max_age_days`, then the
    /// newest entries beyond a `max_size_mb` budget. Returns the number of
    /// entries removed.
    pub fn cleanup(&mut self, max_age_days: f64, max_size_mb: f64) -> usize {
        self.cleanup_at(unix_now(), max_age_days, max_size_mb)
    }

    /// [`cleanup`](Self::cleanup) evaluated at Unix time `now`.
    ///
    /// Entries are walked oldest-access first. Aged entries are removed
    /// without counting toward the budget; every other entry adds its size
    /// to a running total and is removed once that total exceeds the budget.
    pub fn cleanup_at(&mut self, now: f64, max_age_days: f64, max_size_mb: f64) -> usize {
        let max_age = max_age_days * SECONDS_PER_DAY;

        let mut entries: Vec<(&str, &CacheIndexEntry)> = self.index.iter().collect();
        entries.sort_by(|a, b| a.1.last_accessed.total_cmp(&b.1.last_accessed));

        let mut total_mb = 0.0;
        let mut doomed = Vec::new();
        for (key, entry) in entries {
            if now - entry.last_accessed > max_age {
                doomed.push(key.to_string());
                continue;
            }
            total_mb += entry.cache_size_mb;
            if total_mb > max_size_mb {
                doomed.push(key.to_string());
            }
        }

        let mut removed = 0;
        for key in doomed {
            match self.clear_key(&key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(path = %key, error = %e, "could not evict cache entry"),
            }
        }
        if removed > 0 {
            tracing::info!(removed, "cleaned up cache entries");
        }
        removed
    }

    /// Counts indexed paths and their recorded sizes.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_files: self.index.len(),
            total_size_mb: self.index.iter().map(|(_, e)| e.cache_size_mb).sum(),
            cache_dir: self.dir.clone(),
        }
    }

    fn persist_index(&self) -> Result<(), CacheError> {
        self.index.save(&self.dir.join(INDEX_FILE_NAME))
    }
}

/// Current time as Unix seconds.
pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn hash_source(path: &Path) -> Result<String, CacheError> {
    content_hash(path).map_err(|source| CacheError::Unhashable {
        path: path.to_path_buf(),
        source,
    })
}

fn pending(path: &Path, hash: String) -> PendingSave {
    PendingSave {
        path: path.to_path_buf(),
        hash,
    }
}

fn entry_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn new_entry(path: &Path, hash: &str, processing_time: Duration, size_mb: f64) -> CacheIndexEntry {
    let now = unix_now();
    CacheIndexEntry {
        hash: hash.to_string(),
        original_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        cached_at: now,
        last_accessed: now,
        processing_time: processing_time.as_secs_f64(),
        cache_size_mb: size_mb,
    }
}

fn blob_size_mb(blob: &Path) -> f64 {
    fs::metadata(blob)
        .map(|m| m.len() as f64 / BYTES_PER_MB)
        .unwrap_or(0.0)
}
