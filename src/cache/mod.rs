//! Disk-backed object cache.
//!
//! Objects are stored as JSON files keyed by URI (see [`path`]). Expiry is
//! lazy: an expired entry is deleted the next time it is read, or by an
//! explicit [`ObjectCache::collect_garbage`] sweep. Unreadable or corrupt
//! entries are deleted on sight so they are refetched instead of failing.
//!
//! Writes go to a temporary file in the target directory and are renamed
//! into place, so readers never observe a torn entry. Concurrent writes to the
//! same URI are last-writer-wins.

mod path;
mod ttl;

pub use path::entry_path;
pub use ttl::TtlPolicy;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::model::MediaObject;

/// Cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {uri}: {source}")]
    Serialization {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    /// The payload is empty; persisting it would cache a transient absence
    #[error("refusing to cache empty {kind} object {uri}")]
    Empty { uri: String, kind: &'static str },

    #[error("object has no uri")]
    InvalidUri,
}

impl CacheError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a garbage collection sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Entries inspected
    pub scanned: usize,
    /// Entries removed because they had expired
    pub expired: usize,
    /// Entries removed because they could not be read or decoded
    pub corrupt: usize,
}

/// Disk-backed key/value store of [`MediaObject`]s.
#[derive(Debug)]
pub struct ObjectCache {
    root: PathBuf,
    ttl: TtlPolicy,
}

impl ObjectCache {
    /// Create a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, ttl: TtlPolicy) -> Self {
        let root = root.into();
        // Entry writes create their own directories; this only makes the root visible early
        if let Err(e) = fs::create_dir_all(&root) {
            warn!(path = %root.display(), error = %e, "failed to create cache root");
        }
        Self { root, ttl }
    }

    /// Default location: `<user cache dir>/mediaweave/objects`.
    pub fn default_location() -> Self {
        Self::new(default_root(), TtlPolicy::default())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Path of the entry for `uri`.
    pub fn path_for(&self, uri: &str) -> Option<PathBuf> {
        entry_path(&self.root, uri)
    }

    /// Read an entry. Returns `None` on a miss.
    ///
    /// Expired, unreadable and undecodable entries are deleted and reported as
    /// a miss.
    pub fn get(&self, uri: &str) -> Option<MediaObject> {
        self.get_at(uri, Utc::now())
    }

    fn get_at(&self, uri: &str, now: DateTime<Utc>) -> Option<MediaObject> {
        let path = self.path_for(uri)?;
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(_) => {
                trace!(uri, "cache miss");
                return None;
            }
        };
        if meta.is_dir() {
            warn!(uri, path = %path.display(), "cache entry points to a directory");
            return None;
        }

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!(uri, error = %e, "cache entry unreadable, garbage collecting it");
                remove_quietly(&path);
                return None;
            }
        };

        let obj: MediaObject = match serde_json::from_slice(&data) {
            Ok(obj) => obj,
            Err(e) => {
                warn!(uri, error = %e, "cache entry failed to decode, garbage collecting it");
                remove_quietly(&path);
                return None;
            }
        };

        if obj.is_expired_at(now) {
            debug!(uri, "cache entry expired, garbage collecting it");
            remove_quietly(&path);
            return None;
        }

        trace!(uri, "cache hit");
        Some(obj)
    }

    /// Persist an object.
    ///
    /// Stamps `last_modified` and `expires` with the type-specific expiry before
    /// writing. Error objects and semantically empty payloads are refused.
    pub fn put(&self, obj: &mut MediaObject) -> Result<PathBuf, CacheError> {
        self.put_at(obj, Utc::now())
    }

    fn put_at(&self, obj: &mut MediaObject, now: DateTime<Utc>) -> Result<PathBuf, CacheError> {
        let path = self.path_for(&obj.uri).ok_or(CacheError::InvalidUri)?;
        let empty = || CacheError::Empty {
            uri: obj.uri.clone(),
            kind: obj.kind().as_str(),
        };
        if obj.is_empty() {
            return Err(empty());
        }
        let expires = self.ttl.expiry_for(obj.kind(), now).ok_or_else(empty)?;

        obj.last_modified = Some(expires);
        obj.expires = Some(expires);

        let data = serde_json::to_vec(obj).map_err(|source| CacheError::Serialization {
            uri: obj.uri.clone(),
            source,
        })?;
        write_atomic(&path, &data)?;
        trace!(uri = %obj.uri, path = %path.display(), "cached object");
        Ok(path)
    }

    /// [`get`](Self::get) on the blocking thread pool, for async callers.
    pub async fn get_async(self: &Arc<Self>, uri: &str) -> Option<MediaObject> {
        let cache = Arc::clone(self);
        let key = uri.to_string();
        match tokio::task::spawn_blocking(move || cache.get(&key)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(uri, error = %e, "cache read task failed");
                None
            }
        }
    }

    /// [`put`](Self::put) on the blocking thread pool, for async callers.
    ///
    /// Serialization and the write happen on a copy; the expiry stamps are
    /// copied back onto `obj` once the entry is on disk.
    pub async fn put_async(self: &Arc<Self>, obj: &mut MediaObject) -> Result<PathBuf, CacheError> {
        let cache = Arc::clone(self);
        let mut copy = obj.clone();
        let task = tokio::task::spawn_blocking(move || {
            let path = cache.put(&mut copy)?;
            Ok::<_, CacheError>((path, copy.expires, copy.last_modified))
        });
        let (path, expires, last_modified) = task.await.map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: std::io::Error::other(e),
        })??;
        obj.expires = expires;
        obj.last_modified = last_modified;
        Ok(path)
    }

    /// Whether an entry file exists for `uri` (it may still be expired).
    pub fn contains(&self, uri: &str) -> bool {
        self.path_for(uri).is_some_and(|p| p.is_file())
    }

    /// Delete the entry for `uri`. Returns whether a file was removed.
    pub fn remove(&self, uri: &str) -> Result<bool, CacheError> {
        let Some(path) = self.path_for(uri) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Sweep the whole cache, deleting expired and corrupt entries.
    pub fn collect_garbage(&self) -> GcReport {
        let now = Utc::now();
        let mut report = GcReport::default();

        for path in self.entry_files() {
            report.scanned += 1;
            let decoded = fs::read(&path)
                .ok()
                .and_then(|data| serde_json::from_slice::<MediaObject>(&data).ok());
            match decoded {
                Some(obj) if obj.is_expired_at(now) => {
                    debug!(path = %path.display(), "removing expired entry");
                    remove_quietly(&path);
                    report.expired += 1;
                }
                Some(_) => {}
                None => {
                    warn!(path = %path.display(), "removing corrupt entry");
                    remove_quietly(&path);
                    report.corrupt += 1;
                }
            }
        }
        report
    }

    /// Delete every entry.
    pub fn clear(&self) -> Result<(), CacheError> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.root).map_err(|e| CacheError::io(&self.root, e))? {
            let entry = entry.map_err(|e| CacheError::io(&self.root, e))?;
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(|e| CacheError::io(&path, e))?;
        }
        Ok(())
    }

    /// Number of entry files.
    pub fn entry_count(&self) -> usize {
        self.entry_files().count()
    }

    /// Total size of all entry files in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.entry_files()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }

    fn entry_files(&self) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(path::ENTRY_EXTENSION))
    }
}

/// Default cache root under the user cache directory.
pub fn default_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("mediaweave")
        .join("objects")
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    tmp.write_all(data).map_err(|e| CacheError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove cache entry");
        }
    }
}
