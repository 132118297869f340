//! Renames a completed download after the title it was scraped under.

use std::fs;
use std::path::PathBuf;

use crate::detector::CompletedFile;
use crate::error::ItemError;
use crate::sanitize::safe_filename;
use crate::unique::make_unique_path;

/// The durable result of one successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedArtifact {
    pub original_name: String,
    pub path: PathBuf,
}

/// Moves `completed` to a sanitized, unused name in the same directory.
///
/// When `extension_hint` is missing the downloaded file's own extension is
/// kept. On failure the file stays where it is; it is never deleted.
pub fn rename_completed(
    completed: &CompletedFile,
    title: &str,
    extension_hint: Option<&str>,
    hash_hint: Option<&str>,
) -> Result<RenamedArtifact, ItemError> {
    let extension = extension_hint
        .map(str::to_string)
        .or_else(|| {
            completed
                .path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    let dir = completed
        .path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let wanted = dir.join(safe_filename(title, &extension, hash_hint));
    let original_name = completed.file_name();

    if wanted == completed.path {
        return Ok(RenamedArtifact {
            original_name,
            path: wanted,
        });
    }

    let target = make_unique_path(&wanted);
    fs::rename(&completed.path, &target).map_err(|source| ItemError::RenameFailure {
        from: completed.path.clone(),
        to: target.clone(),
        source,
    })?;

    Ok(RenamedArtifact {
        original_name,
        path: target,
    })
}
