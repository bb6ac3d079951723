//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the derivative
//! cache needs: decode, read_metadata, resize, and encode. Every operation
//! works on in-memory data; the cache reads the original once and hands the
//! same bytes to both decode and metadata extraction.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, everything
//! statically linked into the binary.

use super::params::{Encoding, ResizeParams};
use image::DynamicImage;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Embedded image metadata, merged from IPTC and XMP.
///
/// Field mapping:
/// - `title`: XMP `dc:title`, else IPTC Object Name (`2:05`)
/// - `rating`: XMP `xmp:Rating` (`-1` rejected, `0` unrated, `1..=5`)
/// - `keywords`: XMP `dc:subject` and IPTC Keywords (`2:25`), deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub title: Option<String>,
    pub rating: Option<i32>,
    pub keywords: Vec<String>,
}

/// Trait for image processing backends.
///
/// `Send + Sync` because a single backend is shared by every request thread
/// through the cache.
pub trait ImageBackend: Send + Sync {
    /// Decode an encoded image (format sniffed from the bytes).
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Read embedded metadata (title, rating, keywords).
    fn read_metadata(&self, data: &[u8]) -> Result<ImageMetadata, BackendError>;

    /// Resize to exact target dimensions.
    fn resize(&self, image: &DynamicImage, params: &ResizeParams) -> DynamicImage;

    /// Encode into the given writer.
    fn encode(
        &self,
        image: &DynamicImage,
        encoding: Encoding,
        out: &mut dyn Write,
    ) -> Result<(), BackendError>;
}
