//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which derivatives to create) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ResizeParams`]: Target dimensions of a resize.
//! - [`Encoding`]: Output codec of an encode step (lossy JPEG or lossless PNG).
//! - [`DerivativeSettings`]: Everything the cache needs to build both variants.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for a simple resize operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}

/// Output codec of an encode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Jpeg(Quality),
    Png,
}

impl Encoding {
    pub fn mime(self) -> &'static str {
        match self {
            Encoding::Jpeg(_) => "image/jpeg",
            Encoding::Png => "image/png",
        }
    }
}

/// Sizes and quality of the two cached derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeSettings {
    /// Long edge of the reduced variant. Originals are never upscaled.
    pub reduced_edge: u32,
    /// Long edge of the embedded nano thumbnail.
    pub nano_edge: u32,
    pub quality: Quality,
}

impl Default for DerivativeSettings {
    fn default() -> Self {
        Self {
            reduced_edge: 1080,
            nano_edge: 8,
            quality: Quality::default(),
        }
    }
}
