//! On-disk artifact storage.
//!
//! The images directory is the only record of what has been produced: there
//! is no index or sidecar file. Writes go through [`write_atomic`], which
//! writes into a temporary file in the same directory and renames it over the
//! destination, so a reader of an artifact path sees either the previous file
//! or the complete new one, never a truncated write.

use crate::naming::parse_artifact_name;
use crate::registry::FilterKind;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Write `bytes` to `path`, replacing any existing file atomically.
///
/// Creates the parent directory if needed. On error nothing is left at
/// `path` that was not there before; the temporary file is removed on drop.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    // Temp files are created 0600; artifacts are served to other users.
    #[cfg(unix)]
    tmp.as_file().set_permissions(artifact_permissions(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Mode of the file being replaced, or 0644 for a new artifact.
#[cfg(unix)]
fn artifact_permissions(path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644))
}

/// An artifact found in the images directory.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredArtifact {
    pub filter: FilterKind,
    pub declared_name: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// List the artifacts in `images_dir`, sorted by file name.
///
/// Files whose names do not start with a registered filter identifier
/// (temporary files, stray uploads) are skipped. A missing directory is an
/// empty listing, not an error.
pub fn list_artifacts(images_dir: &Path) -> io::Result<Vec<StoredArtifact>> {
    let entries = match fs::read_dir(images_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut artifacts = Vec::new();
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some((filter, declared)) = parse_artifact_name(&file_name) else {
            continue;
        };
        artifacts.push(StoredArtifact {
            filter,
            declared_name: declared.to_string(),
            path: entry.path(),
            size: metadata.len(),
            file_name,
        });
    }
    artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(artifacts)
}
