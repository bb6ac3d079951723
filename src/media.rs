//! The image capability of leaf elements.
//!
//! Any element whose content represents a displayable picture exposes it
//! through [`Image`]: a stable cache key, access to the original bytes, and
//! the derivative cache entry built from them.

use crate::cache::{CacheEntry, CacheError};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

/// Fallback MIME type for files whose extension is not a known image format.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An open byte stream together with its length and MIME type.
pub struct FileContent {
    pub reader: Box<dyn Read + Send>,
    pub size: u64,
    pub mime: &'static str,
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileContent")
            .field("size", &self.size)
            .field("mime", &self.mime)
            .finish_non_exhaustive()
    }
}

/// A displayable picture.
pub trait Image: Send + Sync + fmt::Debug {
    /// Cache key for the current state of the original. Alphanumeric.
    fn hash(&self) -> &str;

    /// Open the original for reading.
    fn open(&self) -> io::Result<FileContent>;

    /// The derivative cache entry, built on first access.
    fn cache_entry(&self) -> Result<Arc<CacheEntry>, CacheError>;

    /// Width of the original in pixels.
    fn width(&self) -> Result<u32, CacheError> {
        Ok(self.cache_entry()?.width)
    }

    /// Height of the original in pixels.
    fn height(&self) -> Result<u32, CacheError> {
        Ok(self.cache_entry()?.height)
    }
}

/// MIME type for a file, derived from its extension.
///
/// ```
/// # use std::path::Path;
/// # use vitrine::media::mime_for_path;
/// assert_eq!(mime_for_path(Path::new("a/b.JPG")), "image/jpeg");
/// assert_eq!(mime_for_path(Path::new("notes.txt")), "application/octet-stream");
/// ```
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(image::ImageFormat::from_extension)
        .map(|format| format.to_mime_type())
        .unwrap_or(OCTET_STREAM)
}
