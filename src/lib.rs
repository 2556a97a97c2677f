//! # Filterbox
//!
//! Apply a named convolution filter to an uploaded image and store the result
//! under a predictable path.
//!
//! # Architecture: One Request, One Artifact
//!
//! A request carries the upload bytes, the name the caller gave them and a
//! filter identifier. Intake validates both inputs, runs the pipeline and
//! writes a single file:
//!
//! ```text
//! validate   filter id + declared name   (nothing touches disk yet)
//! decode     sniffed format, size limits
//! bound      longest side ≤ 500 px, never enlarged
//! filter     fixed 3×3 or 5×5 kernel
//! encode     source format when writable, PNG otherwise
//! store      {images_dir}/{filter}-{declared_name}, atomic rename
//! ```
//!
//! The images directory is the only state. There is no database and no
//! metadata file; `filterbox artifacts` reconstructs the listing from file
//! names alone.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | The closed set of filters and their identifiers |
//! | [`imaging`] | Decode, bound, convolve and encode; backend trait + pure-Rust backend |
//! | [`naming`] | Declared-name validation and artifact path resolution |
//! | [`store`] | Atomic writes and directory listing |
//! | [`intake`] | Request validation, lifecycle and batch orchestration |
//! | [`gif_search`] | Blocking client for a Tenor-style GIF search endpoint |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Reject, Don't Rewrite, Untrusted Names
//!
//! The declared name becomes part of a path. Rather than stripping `..` or
//! separators and hoping the result is harmless, [`naming::DeclaredName`]
//! refuses any name that is not a single plain path component. A refused
//! request writes nothing.
//!
//! ## Overwrite on Collision
//!
//! The same declared name under the same filter always resolves to the same
//! file, so re-uploading replaces the earlier artifact. Different filters
//! never collide because the identifier is part of the file name.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate; the kernels live
//! in [`imaging::kernels`]. The binary has no system image library
//! dependencies.

pub mod config;
pub mod gif_search;
pub mod imaging;
pub mod intake;
pub mod naming;
pub mod output;
pub mod registry;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
