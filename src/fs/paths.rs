//! Path and directory management.
//!
//! Output layout:
//!
//! ```text
//! <root>/@<username>/<userId>.json
//! <root>/@<username>/images/<file>
//! <root>/@<username>/videos/<file>
//! <root>/@<username>/<images|videos>/metadata/<pinId>.json
//! ```

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::naming::sanitize_path_component;
use crate::media::MediaType;

/// Folder holding per-pin metadata inside a media folder.
pub const METADATA_FOLDER: &str = "metadata";

/// Get the per-user folder, `<root>/@<username>`.
pub fn user_dir(root: &Path, username: &str) -> Result<PathBuf> {
    let folder = sanitize_path_component(&format!("@{}", username.trim_start_matches('@')))?;
    Ok(root.join(folder))
}

/// Get the folder media of `media_type` is saved to.
pub fn media_dir(root: &Path, username: &str, media_type: MediaType) -> Result<PathBuf> {
    Ok(user_dir(root, username)?.join(media_type.folder_name()))
}

/// Get the folder per-pin metadata of `media_type` is saved to.
pub fn pin_metadata_dir(root: &Path, username: &str, media_type: MediaType) -> Result<PathBuf> {
    Ok(media_dir(root, username, media_type)?.join(METADATA_FOLDER))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        tracing::debug!("Created folder {}", path.display());
    }
    Ok(())
}
