//! Shared test utilities for the filterbox test suite.
//!
//! Builds small synthetic rasters and their encoded bytes so tests do not
//! depend on fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = encode_gradient(800, 600, ImageFormat::Png);
//! let request = upload_request(bytes, "a.png", "sharpen");
//! ```

use crate::intake::{IntakeRequest, UploadedImage};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Rasters
// =========================================================================

/// A deterministic RGB gradient with some structure for kernels to act on.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = if (x / 4 + y / 4) % 2 == 0 { 40 } else { 200 };
        Rgb([r, g, b])
    })
}

/// [`gradient`] encoded in `format`.
pub fn encode_gradient(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

/// Decode bytes produced by the pipeline. Panics if they are not an image.
pub fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).unwrap_or_else(|e| panic!("artifact is not an image: {e}"))
}

// =========================================================================
// Requests
// =========================================================================

/// A complete request: upload plus filter identifier.
pub fn upload_request(bytes: Vec<u8>, declared_name: &str, filter: &str) -> IntakeRequest {
    IntakeRequest {
        upload: Some(UploadedImage::new(bytes, declared_name)),
        filter: Some(filter.to_string()),
    }
}
