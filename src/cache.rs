//! Derivative cache for displayable images.
//!
//! Decoding and resizing a full-size original takes far longer than serving
//! a precomputed derivative. This module computes, once per distinct file
//! state, everything a gallery page needs: a reduced JPEG, a tiny embedded
//! thumbnail, and the metadata extracted from the original.
//!
//! # Design
//!
//! ## Cache keys
//!
//! Entries are keyed by the hash reported by the owning [`Image`]. For
//! folder images that is a SHA-256 of the absolute path and modification
//! time, so editing a file produces a new key; the old entry simply becomes
//! unreachable and is never evicted.
//!
//! ## Storage
//!
//! Each hash owns two files in the cache directory:
//!
//! - `<hash>.jpg`: the reduced variant (long edge bounded, never upscaled)
//! - `<hash>.json`: a versioned record with title, rating, tags, original
//!   dimensions and the nano thumbnail bytes
//!
//! Both are written to temporaries and renamed into place, the image first.
//! A record therefore implies its image; a record without its image, with a
//! different [`RECORD_VERSION`], or that fails to parse is treated as a miss.
//!
//! ## Concurrency
//!
//! The first accesses to a hash are coalesced: one caller runs the build, the
//! others wait on the same slot and receive the same result, success or
//! error. The in-flight map lock is only held to register or retire a slot.

use crate::imaging::{
    BackendError, DerivativeSettings, ImageBackend, ImageMetadata, create_derivatives,
};
use crate::media::{FileContent, Image};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Version of the on-disk record format. Bump this to invalidate all
/// existing records when the format or its meaning changes.
pub const RECORD_VERSION: u32 = 1;

/// MIME type of the reduced variant.
pub const REDUCED_MIME: &str = "image/jpeg";

/// MIME type of the nano thumbnail.
pub const NANO_MIME: &str = "image/png";

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("no cache entry for {0}")]
    NotFound(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("cannot decode original of {hash}: {message}")]
    Decode { hash: String, message: String },
    #[error("cannot encode derivatives of {hash}: {message}")]
    Encode { hash: String, message: String },
    #[error("corrupt cache record {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

impl CacheError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    fn from_backend(hash: &str, path: &Path, err: BackendError) -> Self {
        match err {
            BackendError::Io(e) => Self::io(path, e),
            BackendError::Decode(message) => Self::Decode {
                hash: hash.to_string(),
                message,
            },
            BackendError::ProcessingFailed(message) => Self::Encode {
                hash: hash.to_string(),
                message,
            },
        }
    }
}

/// Derived artifacts for one cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    #[serde(skip)]
    pub hash: String,
    #[serde(skip)]
    reduced_path: PathBuf,
    pub title: Option<String>,
    /// `-1` rejected, `0` unrated, `1..=5` stars.
    pub rating: i32,
    pub tags: Vec<String>,
    /// Width of the original.
    pub width: u32,
    /// Height of the original.
    pub height: u32,
    /// Losslessly encoded nano thumbnail.
    pub nano: Vec<u8>,
}

impl CacheEntry {
    /// Path of the reduced JPEG on disk.
    pub fn reduced_path(&self) -> &Path {
        &self.reduced_path
    }

    /// Open the reduced variant for streaming.
    pub fn reduced_image(&self) -> Result<FileContent, CacheError> {
        let file = File::open(&self.reduced_path)
            .map_err(|e| CacheError::io(&self.reduced_path, e))?;
        let size = file
            .metadata()
            .map_err(|e| CacheError::io(&self.reduced_path, e))?
            .len();
        Ok(FileContent {
            reader: Box::new(file),
            size,
            mime: REDUCED_MIME,
        })
    }

    /// The embedded nano thumbnail and its MIME type.
    pub fn nano_image(&self) -> (&[u8], &'static str) {
        (&self.nano, NANO_MIME)
    }
}

/// On-disk record: the entry plus a format version.
#[derive(Serialize, Deserialize)]
struct Record<E> {
    version: u32,
    #[serde(flatten)]
    entry: E,
}

/// How [`Cache::resolve`] obtained an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from a previously persisted record.
    Stored,
    /// Built by this call.
    Built,
    /// Built by a concurrent call for the same key.
    Shared,
}

type BuildResult = Result<Arc<CacheEntry>, CacheError>;

/// Summary of cache activity since the cache was opened.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub stored: u64,
    pub built: u64,
    pub shared: u64,
    pub failed: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.stored + self.built + self.shared + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cached, {} built", self.stored, self.built)?;
        if self.shared > 0 {
            write!(f, ", {} shared", self.shared)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

#[derive(Default)]
struct Counters {
    stored: AtomicU64,
    built: AtomicU64,
    shared: AtomicU64,
    failed: AtomicU64,
}

/// Persistent, concurrency-safe derivative cache.
pub struct Cache {
    dir: PathBuf,
    settings: DerivativeSettings,
    backend: Arc<dyn ImageBackend>,
    in_flight: Mutex<HashMap<String, Arc<OnceLock<BuildResult>>>>,
    counters: Counters,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("dir", &self.dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache keys are plain alphanumeric strings; anything else could escape
/// the cache directory.
pub fn is_valid_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl Cache {
    /// Open (creating if needed) the cache directory.
    pub fn open(
        dir: impl Into<PathBuf>,
        settings: DerivativeSettings,
        backend: Arc<dyn ImageBackend>,
    ) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        Ok(Self {
            dir,
            settings,
            backend,
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &DerivativeSettings {
        &self.settings
    }

    fn record_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.json"))
    }

    /// Path where the reduced variant of `hash` is (or would be) stored.
    pub fn reduced_image_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.jpg"))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            stored: self.counters.stored.load(Ordering::Relaxed),
            built: self.counters.built.load(Ordering::Relaxed),
            shared: self.counters.shared.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Look up a persisted entry. Never builds.
    pub fn query_by_hash(&self, hash: &str) -> Result<CacheEntry, CacheError> {
        if !is_valid_hash(hash) {
            return Err(CacheError::NotFound(hash.to_string()));
        }
        match self.load_record(hash) {
            Ok(Some(entry)) => Ok(entry),
            Ok(None) => Err(CacheError::NotFound(hash.to_string())),
            Err(e) => {
                debug!(hash, error = %e, "discarding unusable cache record");
                Err(CacheError::NotFound(hash.to_string()))
            }
        }
    }

    fn load_record(&self, hash: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.record_path(hash);
        let content = match std::fs::read(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        let record: Record<CacheEntry> =
            serde_json::from_slice(&content).map_err(|e| CacheError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if record.version != RECORD_VERSION {
            return Err(CacheError::Corrupt {
                path,
                message: format!("record version {}", record.version),
            });
        }
        let reduced_path = self.reduced_image_path(hash);
        if !reduced_path.is_file() {
            return Ok(None);
        }
        Ok(Some(CacheEntry {
            hash: hash.to_string(),
            reduced_path,
            ..record.entry
        }))
    }

    /// Return the entry for `image`, building and persisting it on a miss.
    pub fn query_or_build(&self, image: &dyn Image) -> Result<Arc<CacheEntry>, CacheError> {
        self.resolve(image).map(|(entry, _)| entry)
    }

    /// Like [`query_or_build`](Self::query_or_build), also reporting where
    /// the entry came from.
    pub fn resolve(&self, image: &dyn Image) -> Result<(Arc<CacheEntry>, Origin), CacheError> {
        let hash = image.hash();
        if !is_valid_hash(hash) {
            return Err(CacheError::NotFound(hash.to_string()));
        }
        if let Ok(entry) = self.query_by_hash(hash) {
            debug!(hash, "cache hit");
            self.counters.stored.fetch_add(1, Ordering::Relaxed);
            return Ok((Arc::new(entry), Origin::Stored));
        }

        let slot = Arc::clone(lock(&self.in_flight).entry(hash.to_string()).or_default());

        let mut origin = Origin::Shared;
        let result = slot
            .get_or_init(|| {
                // Another build may have landed between the lookup and
                // registering the slot.
                if let Ok(entry) = self.query_by_hash(hash) {
                    origin = Origin::Stored;
                    return Ok(Arc::new(entry));
                }
                origin = Origin::Built;
                self.build(image).map(Arc::new)
            })
            .clone();

        if origin != Origin::Shared {
            let mut in_flight = lock(&self.in_flight);
            if in_flight
                .get(hash)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                in_flight.remove(hash);
            }
        } else {
            debug!(hash, "joined in-flight build");
        }

        let counter = match (&result, origin) {
            (Err(_), Origin::Built) => &self.counters.failed,
            (_, Origin::Stored) => &self.counters.stored,
            (_, Origin::Built) => &self.counters.built,
            (_, Origin::Shared) => &self.counters.shared,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        result.map(|entry| (entry, origin))
    }

    fn build(&self, image: &dyn Image) -> Result<CacheEntry, CacheError> {
        let hash = image.hash();
        let reduced_path = self.reduced_image_path(hash);

        let mut original = image.open().map_err(|e| CacheError::io(hash, e))?;
        let mut data = Vec::with_capacity(original.size as usize);
        original
            .reader
            .read_to_end(&mut data)
            .map_err(|e| CacheError::io(hash, e))?;

        // Dropping the temporary on any early return removes it.
        let tmp = self.temp_file()?;
        let mut writer = BufWriter::new(tmp);
        let derivatives = create_derivatives(&*self.backend, &data, &mut writer, &self.settings)
            .map_err(|e| CacheError::from_backend(hash, &reduced_path, e))?;
        let tmp = writer
            .into_inner()
            .map_err(|e| CacheError::io(&reduced_path, e.into_error()))?;

        let metadata = match self.backend.read_metadata(&data) {
            Ok(m) => m,
            Err(e) => {
                warn!(hash, error = %e, "metadata extraction failed, using defaults");
                ImageMetadata::default()
            }
        };

        tmp.persist(&reduced_path)
            .map_err(|e| CacheError::io(&reduced_path, e.error))?;

        let entry = CacheEntry {
            hash: hash.to_string(),
            reduced_path,
            title: metadata.title.filter(|t| !t.trim().is_empty()),
            rating: metadata.rating.unwrap_or(0),
            tags: metadata.keywords,
            width: derivatives.original.width,
            height: derivatives.original.height,
            nano: derivatives.nano,
        };

        if let Err(e) = self.store_record(&entry) {
            warn!(hash, error = %e, "failed to persist cache record");
        }
        info!(
            hash,
            width = entry.width,
            height = entry.height,
            "built derivatives"
        );
        Ok(entry)
    }

    fn temp_file(&self) -> Result<tempfile::NamedTempFile, CacheError> {
        tempfile::Builder::new()
            .prefix(".build-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::io(&self.dir, e))
    }

    fn store_record(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.record_path(&entry.hash);
        let json = serde_json::to_vec_pretty(&Record {
            version: RECORD_VERSION,
            entry,
        })
        .map_err(|e| CacheError::io(&path, e.into()))?;

        let mut tmp = self.temp_file()?;
        tmp.write_all(&json)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::io(&path, e.error))?;
        Ok(())
    }
}
