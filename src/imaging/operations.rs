//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They decide
//! what to do (whether to shrink, which format to write) and let the backend
//! do it. Nothing here touches the filesystem; persisting the result is the
//! [`store`](crate::store)'s job.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_bounded_dimensions;
use super::params::PipelineParams;
use super::rust_backend::WRITABLE_FORMATS;
use crate::registry::FilterKind;
use image::{DynamicImage, ImageFormat};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded output of one pipeline run, ready to be written.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    /// Format written.
    pub format: ImageFormat,
    /// Format the upload was sniffed as.
    pub source_format: ImageFormat,
    /// Dimensions of the decoded upload.
    pub source: Dimensions,
    /// Dimensions after bounding.
    pub output: Dimensions,
}

/// Pick the format to write: the source's own when we can encode it, else PNG.
///
/// Every decoder enabled in `Cargo.toml` has a matching encoder, so with
/// [`RustBackend`](super::RustBackend) the PNG branch only runs if a
/// read-only decoder feature is turned on, or if another backend decodes more.
pub fn output_format(source: ImageFormat) -> ImageFormat {
    if WRITABLE_FORMATS.contains(&source) {
        source
    } else {
        ImageFormat::Png
    }
}

/// Shrink `image` so neither side exceeds `max_edge`. Never enlarges.
pub fn bound(backend: &impl ImageBackend, image: DynamicImage, max_edge: u32) -> DynamicImage {
    match calculate_bounded_dimensions((image.width(), image.height()), max_edge) {
        Some((width, height)) => backend.resize(&image, width, height),
        None => image,
    }
}

/// Decode, bound, filter and re-encode one upload.
///
/// Stops at the first failing step; no later step runs.
pub fn run_pipeline(
    backend: &impl ImageBackend,
    bytes: &[u8],
    filter: FilterKind,
    params: &PipelineParams,
) -> Result<EncodedArtifact> {
    let decoded = backend.decode(bytes, &params.limits)?;
    let source = Dimensions::of(&decoded.image);

    let bounded = bound(backend, decoded.image, params.max_dimension);
    let filtered = backend.filter(&bounded, filter);

    let format = output_format(decoded.format);
    let encoded = backend.encode(&filtered, format, params.quality)?;

    Ok(EncodedArtifact {
        bytes: encoded,
        format,
        source_format: decoded.format,
        source,
        output: Dimensions::of(&filtered),
    })
}
