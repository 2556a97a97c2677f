//! Image transform pipeline, pure Rust.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with sniffed format and `image::Limits` |
//! | **Bound** | [`calculate_bounded_dimensions`] + Lanczos3 `resize_exact` |
//! | **Filter** | fixed convolution kernels from [`kernels`] |
//! | **Encode** | source format when writable, PNG otherwise |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Kernels**: The convolution weights and the routine applying them
//! - **Parameters**: Data structures describing one pipeline run
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`run_pipeline`], sequencing the backend steps

pub mod backend;
mod calculations;
pub mod kernels;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, Dimensions, ImageBackend, format_name};
pub use calculations::calculate_bounded_dimensions;
pub use operations::{EncodedArtifact, output_format, run_pipeline};
pub use params::{DecodeLimits, PipelineParams, Quality};
pub use rust_backend::RustBackend;
