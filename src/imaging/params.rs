//! Parameter types for the transform pipeline.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the configuration layer and
//! [`operations`](super::operations), which hands them to the backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`DecodeLimits`]: Largest input raster the decoder will accept.
//! - [`PipelineParams`]: Everything one pipeline run needs besides the bytes and the filter.

use crate::config::ImagesConfig;

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

/// Upper bound on the raster the decoder may allocate.
///
/// Checked against the header before pixel data is read, so an oversized
/// upload is refused without paying for its decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl DecodeLimits {
    pub fn square(edge: u32) -> Self {
        Self {
            max_width: edge,
            max_height: edge,
        }
    }

    pub(crate) fn to_image_limits(self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::square(16_384)
    }
}

/// Parameters for one run of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineParams {
    /// Neither output side may exceed this.
    pub max_dimension: u32,
    /// JPEG output quality.
    pub quality: Quality,
    pub limits: DecodeLimits,
}

impl PipelineParams {
    pub fn from_images_config(config: &ImagesConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            quality: Quality::new(config.quality),
            limits: DecodeLimits::square(config.max_input_dimension),
        }
    }
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self::from_images_config(&ImagesConfig::default())
    }
}
