//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the four pixel-level steps of the
//! pipeline: decode, resize, filter and encode. Sequencing those steps is the
//! job of [`operations`](super::operations); the backend only does the work.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests swap in the
//! recording `MockBackend` to check sequencing without touching pixels.

use super::params::{DecodeLimits, Quality};
use crate::registry::FilterKind;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("cannot encode {} image: {message}", format_name(.format))]
    Encode {
        format: ImageFormat,
        message: String,
    },
}

/// Short lowercase name of a format, e.g. `png`.
pub fn format_name(format: &ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("unknown")
}

/// Width and height of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// A decoded raster together with the format its bytes were sniffed as.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Trait for image processing backends.
///
/// Implementations must be deterministic: the same input always produces
/// the same output.
pub trait ImageBackend: Sync {
    /// Parse encoded bytes into a raster, refusing anything over `limits`.
    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, BackendError>;

    /// Resample to exactly `width` × `height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Apply one registered filter.
    fn filter(&self, image: &DynamicImage, kind: FilterKind) -> DynamicImage;

    /// Serialize the raster in `format`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
