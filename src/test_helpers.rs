//! Shared test utilities for the vitrine test suite.
//!
//! Provides in-memory element contents (a stub image and a container whose
//! listing always fails), a cache wired to the recording `MockBackend`, and
//! small filesystem and assertion helpers.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let root = Arc::new(Element::new("", "", Album::new(vec![
//!     image_leaf("dawn.jpg", "h1"),
//! ])));
//! assert_eq!(child_names(&root.children().unwrap()), ["dawn.jpg"]);
//! ```

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{Cache, CacheEntry, CacheError};
use crate::element::{Content, Element, ElementRef, Identity, Kind, TreeError};
use crate::imaging::backend::tests::MockBackend;
use crate::imaging::{DerivativeSettings, ImageBackend};
use crate::media::{FileContent, Image};

// =========================================================================
// In-memory contents
// =========================================================================

/// An image whose original lives in memory.
///
/// Its identity is `File(hash)`, so two stubs with the same hash count as
/// the same picture.
#[derive(Debug)]
pub struct StubImage {
    hash: String,
    data: Option<Vec<u8>>,
    cache: Option<Arc<Cache>>,
}

impl StubImage {
    pub fn new(hash: &str, data: &[u8]) -> Self {
        Self {
            hash: hash.to_string(),
            data: Some(data.to_vec()),
            cache: None,
        }
    }

    /// An image whose original cannot be opened.
    pub fn unreadable(hash: &str) -> Self {
        Self {
            hash: hash.to_string(),
            data: None,
            cache: None,
        }
    }

    pub fn cached_by(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl Image for StubImage {
    fn hash(&self) -> &str {
        &self.hash
    }

    fn open(&self) -> io::Result<FileContent> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "stub original missing"))?;
        Ok(FileContent {
            size: data.len() as u64,
            reader: Box::new(Cursor::new(data)),
            mime: "image/jpeg",
        })
    }

    fn cache_entry(&self) -> Result<Arc<CacheEntry>, CacheError> {
        match &self.cache {
            Some(cache) => cache.query_or_build(self),
            None => Err(CacheError::NotFound(self.hash.clone())),
        }
    }
}

impl Content for StubImage {
    fn children(&self, _this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        Ok(Vec::new())
    }

    fn is_container(&self) -> bool {
        false
    }

    fn identity(&self) -> Identity {
        Identity::File(PathBuf::from(&self.hash))
    }

    fn kind(&self) -> Kind {
        Kind::Image
    }

    fn image(&self) -> Option<&dyn Image> {
        Some(self)
    }
}

/// A container whose listing always fails with an I/O error.
#[derive(Debug)]
pub struct FailingContainer;

impl Content for FailingContainer {
    fn children(&self, _this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        Err(TreeError::Io {
            path: PathBuf::from("/unreadable"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        })
    }

    fn is_container(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        Identity::Directory(PathBuf::from("/unreadable"))
    }

    fn kind(&self) -> Kind {
        Kind::Folder
    }
}

/// A detached image element named `name` (also its url_name).
pub fn image_leaf(name: &str, hash: &str) -> Element {
    Element::new(name, name, StubImage::new(hash, hash.as_bytes()))
}

// =========================================================================
// Cache and filesystem fixtures
// =========================================================================

/// A cache in `dir` backed by `backend`, with default derivative settings.
pub fn mock_cache(dir: &Path, backend: &Arc<MockBackend>) -> Arc<Cache> {
    Arc::new(
        Cache::open(
            dir,
            DerivativeSettings::default(),
            Arc::clone(backend) as Arc<dyn ImageBackend>,
        )
        .unwrap(),
    )
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

// =========================================================================
// Assertions
// =========================================================================

/// url_names of `elements`, in order.
pub fn child_names(elements: &[ElementRef]) -> Vec<String> {
    elements.iter().map(|e| e.url_name().to_string()).collect()
}

/// Display names of `elements`, in order.
pub fn display_names(elements: &[ElementRef]) -> Vec<String> {
    elements.iter().map(|e| e.name().to_string()).collect()
}

/// Assert the url_names of the children at `path` below `origin`.
pub fn assert_children(origin: &ElementRef, path: &str, expected: &[&str]) {
    let element = origin
        .traverse(path)
        .unwrap_or_else(|e| panic!("cannot resolve '{path}': {e}"));
    let children = element
        .children()
        .unwrap_or_else(|e| panic!("cannot list '{path}': {e}"));
    assert_eq!(child_names(&children), expected, "children of '{path}' mismatch");
}
