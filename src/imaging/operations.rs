//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take settings, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::plan_derivative_sizes;
use super::params::{DerivativeSettings, Encoding, ResizeParams};
use std::io::Write;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Outcome of a derivative build, minus the reduced raster that was streamed
/// to the caller's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivatives {
    /// Dimensions of the original.
    pub original: Dimensions,
    /// Dimensions of the reduced variant.
    pub reduced: Dimensions,
    /// Losslessly encoded nano thumbnail.
    pub nano: Vec<u8>,
}

/// Decode an original and produce both cached variants.
///
/// The reduced variant is encoded as JPEG into `reduced_out`; the nano
/// thumbnail is encoded as PNG and returned inline. Decoding happens exactly
/// once per call.
pub fn create_derivatives(
    backend: &dyn ImageBackend,
    data: &[u8],
    reduced_out: &mut dyn Write,
    settings: &DerivativeSettings,
) -> Result<Derivatives> {
    let img = backend.decode(data)?;
    let original = Dimensions {
        width: img.width(),
        height: img.height(),
    };
    let sizes = plan_derivative_sizes(
        (original.width, original.height),
        settings.reduced_edge,
        settings.nano_edge,
    );

    let reduced_img = if sizes.reduced == (original.width, original.height) {
        img.clone()
    } else {
        backend.resize(
            &img,
            &ResizeParams {
                width: sizes.reduced.0,
                height: sizes.reduced.1,
            },
        )
    };
    backend.encode(&reduced_img, Encoding::Jpeg(settings.quality), reduced_out)?;

    let nano_img = backend.resize(
        &img,
        &ResizeParams {
            width: sizes.nano.0,
            height: sizes.nano.1,
        },
    );
    let mut nano = Vec::new();
    backend.encode(&nano_img, Encoding::Png, &mut nano)?;

    Ok(Derivatives {
        original,
        reduced: Dimensions {
            width: sizes.reduced.0,
            height: sizes.reduced.1,
        },
        nano,
    })
}
