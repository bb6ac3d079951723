//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders, format sniffed) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | IPTC metadata | custom `iptc_parser` (JPEG APP13 + TIFF IFD) |
//! | XMP metadata | custom `xmp_parser` (packet scan) |

use super::backend::{BackendError, ImageBackend, ImageMetadata};
use super::iptc_parser::{IptcData, read_iptc};
use super::params::{Encoding, ResizeParams};
use super::xmp_parser::{XmpData, read_xmp};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{Cursor, Write};
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine XMP and IPTC findings. XMP wins for the title; keywords from
/// both sources are kept once each, XMP first.
fn merge_metadata(xmp: XmpData, iptc: IptcData) -> ImageMetadata {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in xmp.subjects.into_iter().chain(iptc.keywords) {
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    ImageMetadata {
        title: xmp.title.or(iptc.object_name),
        rating: xmp.rating,
        keywords,
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, BackendError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn read_metadata(&self, data: &[u8]) -> Result<ImageMetadata, BackendError> {
        Ok(merge_metadata(read_xmp(data), read_iptc(data)))
    }

    fn resize(&self, image: &DynamicImage, params: &ResizeParams) -> DynamicImage {
        image.resize_exact(params.width, params.height, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        encoding: Encoding,
        out: &mut dyn Write,
    ) -> Result<(), BackendError> {
        let result = match encoding {
            Encoding::Jpeg(quality) => {
                // JPEG has no alpha channel
                let encoder = JpegEncoder::new_with_quality(out, quality.value() as u8);
                DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
            }
            Encoding::Png => {
                let encoder = PngEncoder::new(out);
                DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)
            }
        };
        result.map_err(|e| {
            BackendError::ProcessingFailed(format!("{} encode failed: {}", encoding.mime(), e))
        })
    }
}
