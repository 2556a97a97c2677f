//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `ImageReader::with_guessed_format` (magic bytes, not the file name) |
//! | Decode (PNG, JPEG, GIF, BMP, TIFF, WebP) | `ImageReader::decode` under `image::Limits` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Filter | [`kernels::convolve`](super::kernels::convolve) |
//! | Encode JPEG | `JpegEncoder::new_with_quality` (alpha dropped) |
//! | Encode others | `DynamicImage::write_to` |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::kernels;
use super::params::{DecodeLimits, Quality};
use crate::registry::FilterKind;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats the pipeline can write back out. Anything else is re-encoded as PNG.
pub const WRITABLE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Backend using the `image` crate ecosystem.
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

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, BackendError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| BackendError::Decode("unrecognized image format".into()))?;
        reader.limits(limits.to_image_limits());
        let image = reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(DecodedImage { image, format })
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn filter(&self, image: &DynamicImage, kind: FilterKind) -> DynamicImage {
        let filtered = kernels::convolve(&image.to_rgba8(), kind.kernel());
        if image.color().has_alpha() {
            DynamicImage::ImageRgba8(filtered)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(filtered).to_rgb8())
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        let result = match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
                DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
            }
            other => image.write_to(&mut buf, other),
        };
        result.map_err(|e| BackendError::Encode {
            format,
            message: e.to_string(),
        })?;
        Ok(buf.into_inner())
    }
}
