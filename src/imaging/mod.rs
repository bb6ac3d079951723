//! Image processing for the derivative cache. Pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with sniffed format |
//! | **Metadata** | custom IPTC (JPEG APP13 + TIFF IFD) and XMP parsers |
//! | **Reduce → JPEG** | Lanczos3 + `JpegEncoder` |
//! | **Nano → PNG** | Lanczos3 + `PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub(crate) mod iptc_parser;
pub mod operations;
mod params;
pub mod rust_backend;
pub(crate) mod xmp_parser;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageMetadata};
pub use calculations::{DerivativeSizes, fit_within, plan_derivative_sizes};
pub use operations::{Derivatives, create_derivatives};
pub use params::{DerivativeSettings, Encoding, Quality, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
