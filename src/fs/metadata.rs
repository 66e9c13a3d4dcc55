//! Metadata persistence and cache lookup.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CacheKey;
use crate::error::Result;
use crate::fs::paths::{ensure_dir, pin_metadata_dir, user_dir, METADATA_FOLDER};
use crate::media::{MediaType, MetadataDocument};

/// Save a user feed's metadata to `<root>/@<username>/<userId>.json`.
///
/// Returns the path written, or `None` when the file exists and `overwrite` is off.
pub fn save_user_metadata(
    root: &Path,
    document: &MetadataDocument,
    overwrite: bool,
) -> Result<Option<PathBuf>> {
    let dir = user_dir(root, &document.author.username)?;
    let path = dir.join(format!("{}.json", document.author.user_id));
    write_document(&dir, &path, document, overwrite)
}

/// Save a single pin's metadata to `<root>/@<username>/<type>s/metadata/<pinId>.json`.
pub fn save_pin_metadata(
    root: &Path,
    document: &MetadataDocument,
    pin_id: &str,
    media_type: MediaType,
    overwrite: bool,
) -> Result<Option<PathBuf>> {
    let dir = pin_metadata_dir(root, &document.author.username, media_type)?;
    let path = dir.join(format!("{}.json", pin_id));
    write_document(&dir, &path, document, overwrite)
}

fn write_document(
    dir: &Path,
    path: &Path,
    document: &MetadataDocument,
    overwrite: bool,
) -> Result<Option<PathBuf>> {
    if path.exists() && !overwrite {
        tracing::warn!("Metadata file already exists: {}", path.display());
        return Ok(None);
    }

    ensure_dir(dir)?;
    fs::write(path, serde_json::to_string_pretty(document)?)?;
    tracing::info!("Metadata saved to {}", path.display());

    Ok(Some(path.to_path_buf()))
}

/// Find previously saved metadata for `key` under `root`.
pub fn find_cached(root: &Path, key: &CacheKey) -> Result<Option<MetadataDocument>> {
    let path = match key {
        CacheKey::Username(username) => find_user_document(root, username)?,
        CacheKey::PinId(pin_id) => find_pin_document(root, pin_id)?,
    };

    match path {
        Some(path) => {
            tracing::info!("Found cached metadata: {}", path.display());
            let content = fs::read_to_string(&path)?;
            Ok(Some(serde_json::from_str(&content)?))
        }
        None => Ok(None),
    }
}

fn find_user_document(root: &Path, username: &str) -> Result<Option<PathBuf>> {
    let dir = user_dir(root, username)?;
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    candidates.sort();

    Ok(candidates.into_iter().next())
}

fn find_pin_document(root: &Path, pin_id: &str) -> Result<Option<PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }

    let mut user_dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    user_dirs.sort();

    for dir in user_dirs {
        tracing::debug!("Scanning {} for pin {}", dir.display(), pin_id);
        for media_type in [MediaType::Image, MediaType::Video] {
            let metadata_dir = dir.join(media_type.folder_name()).join(METADATA_FOLDER);
            if !metadata_dir.is_dir() {
                continue;
            }

            let mut files: Vec<PathBuf> = fs::read_dir(&metadata_dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .collect();
            files.sort();

            let found = files.into_iter().find(|p| {
                p.extension().is_some_and(|ext| ext == "json")
                    && p
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.contains(pin_id))
            });
            if found.is_some() {
                return Ok(found);
            }
        }
    }

    Ok(None)
}
