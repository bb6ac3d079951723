//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `original` so its longer edge is at most `max_edge`, keeping the
/// aspect ratio.
///
/// Images already within the bound are returned unchanged (never upscaled).
/// Neither output edge drops below 1 pixel, so extreme panoramas still yield
/// a valid raster.
///
/// # Examples
/// ```
/// # use vitrine::imaging::fit_within;
/// // 4000x3000 landscape bounded to 1080 → 1080x810
/// assert_eq!(fit_within((4000, 3000), 1080), (1080, 810));
///
/// // Already small enough → unchanged
/// assert_eq!(fit_within((640, 480), 1080), (640, 480));
/// ```
pub fn fit_within(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);

    if longer_edge <= max_edge || longer_edge == 0 {
        return (orig_w, orig_h);
    }

    let ratio = max_edge as f64 / longer_edge as f64;
    if orig_w >= orig_h {
        // Landscape or square
        let h = (orig_h as f64 * ratio).round() as u32;
        (max_edge, h.max(1))
    } else {
        // Portrait
        let w = (orig_w as f64 * ratio).round() as u32;
        (w.max(1), max_edge)
    }
}

/// Dimensions of both cached variants for one original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeSizes {
    pub reduced: (u32, u32),
    pub nano: (u32, u32),
}

/// Plan the reduced and nano sizes for an original of the given dimensions.
pub fn plan_derivative_sizes(original: (u32, u32), reduced_edge: u32, nano_edge: u32) -> DerivativeSizes {
    DerivativeSizes {
        reduced: fit_within(original, reduced_edge),
        nano: fit_within(original, nano_edge),
    }
}
