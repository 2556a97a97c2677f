//! Artifact naming: where a filtered upload lands and how it is referenced.
//!
//! An artifact's file name is the filter identifier, a dash, and the name the
//! caller declared for the upload:
//!
//! ```text
//! declared "cat.png" + filter "blur"          → static/images/blur-cat.png
//! declared "cat.png" + filter "edge-enhance"  → static/images/edge-enhance-cat.png
//! ```
//!
//! ## Collisions
//!
//! The same declared name under two filters never collides. The same declared
//! name under the same filter always maps to the same path, so a later upload
//! overwrites an earlier one. That is the documented contract: the path is the
//! only record of an artifact, and there is no content hash in it.
//!
//! ## Untrusted names
//!
//! The declared name comes straight from the caller. [`DeclaredName::parse`]
//! is the only way to obtain one and it refuses anything that could step
//! outside the images directory: `..`, `/` or `\`, drive or stream
//! specifiers (`:`), and control characters.

use crate::config::StorageConfig;
use crate::registry::FilterKind;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest file name most filesystems accept.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Why a declared name was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("file name is empty")]
    Empty,
    #[error("file name contains '..'")]
    ParentReference,
    #[error("file name contains a path separator")]
    Separator,
    #[error("file name contains a drive or stream specifier")]
    DriveSpecifier,
    #[error("file name contains control characters")]
    ControlCharacter,
    #[error("file name is too long")]
    TooLong,
}

/// A caller-declared file name that is safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredName(String);

impl DeclaredName {
    /// Validate an untrusted name. Rejects rather than rewrites.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw.contains("..") {
            return Err(NameError::ParentReference);
        }
        if raw.contains(['/', '\\']) {
            return Err(NameError::Separator);
        }
        if raw.contains(':') {
            return Err(NameError::DriveSpecifier);
        }
        if raw.chars().any(char::is_control) {
            return Err(NameError::ControlCharacter);
        }
        if raw.len() + longest_prefix_len() > MAX_FILE_NAME_BYTES {
            return Err(NameError::TooLong);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeclaredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `"{filter}-"` for the longest registered identifier.
fn longest_prefix_len() -> usize {
    FilterKind::ALL
        .iter()
        .map(|k| k.as_str().len() + 1)
        .max()
        .unwrap_or(1)
}

/// `{filter}-{declared}`.
pub fn artifact_file_name(filter: FilterKind, name: &DeclaredName) -> String {
    format!("{}-{}", filter.as_str(), name.as_str())
}

/// Split an artifact file name back into its filter and declared name.
///
/// Returns `None` for names that do not start with a registered identifier
/// followed by a dash, or that have nothing after the dash.
pub fn parse_artifact_name(file_name: &str) -> Option<(FilterKind, &str)> {
    FilterKind::ALL
        .iter()
        .filter_map(|&kind| {
            file_name
                .strip_prefix(kind.as_str())
                .and_then(|rest| rest.strip_prefix('-'))
                .filter(|rest| !rest.is_empty())
                .map(|rest| (kind, rest))
        })
        // Longest identifier wins so "edge-enhance-x" is not read as some "edge" filter.
        .max_by_key(|(kind, _)| kind.as_str().len())
}

/// Where one artifact lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifactPath {
    pub filter: FilterKind,
    pub file_name: String,
    pub path: PathBuf,
}

/// The images directory plus the public prefix artifacts are served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub images_dir: PathBuf,
    pub public_prefix: String,
}

impl StoragePaths {
    pub fn new(images_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            images_dir: images_dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Resolve storage against an application root directory.
    pub fn from_config(root: &Path, storage: &StorageConfig) -> Self {
        Self::new(root.join(&storage.images_dir), storage.public_prefix.clone())
    }

    /// Path for `name` filtered with `filter`. Pure; touches nothing on disk.
    pub fn resolve(&self, name: &DeclaredName, filter: FilterKind) -> StoredArtifactPath {
        let file_name = artifact_file_name(filter, name);
        StoredArtifactPath {
            filter,
            path: self.images_dir.join(&file_name),
            file_name,
        }
    }

    /// [`resolve`](Self::resolve) for a raw, not yet validated name.
    pub fn resolve_declared(
        &self,
        declared: &str,
        filter: FilterKind,
    ) -> Result<StoredArtifactPath, NameError> {
        Ok(self.resolve(&DeclaredName::parse(declared)?, filter))
    }

    /// Relative reference the rendering layer uses to fetch the artifact.
    pub fn public_reference(&self, artifact: &StoredArtifactPath) -> String {
        let prefix = self.public_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            artifact.file_name.clone()
        } else {
            format!("{}/{}", prefix, artifact.file_name)
        }
    }
}
