//! Filename generation and manipulation.

use url::Url;

use crate::error::{Error, Result};

/// Container produced when a manifest is assembled into a single file.
const ASSEMBLED_EXTENSION: &str = "mp4";

/// Strip characters that are illegal in filenames on common filesystems.
///
/// Removes `<>:"/\|?*` and control characters. Fails if nothing usable remains.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let sanitized: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    let sanitized = sanitized.trim();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return Err(Error::InvalidFilename(format!(
            "'{}' has no usable characters",
            name
        )));
    }

    Ok(sanitized.to_string())
}

/// Sanitize a folder name such as `@username`.
///
/// Separators are replaced rather than dropped so distinct names stay distinct.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c => c,
        })
        .collect();

    sanitize_filename(&replaced)
}

/// Derive the output filename from a media url.
///
/// Uses the last path segment. Manifest urls get an `.mp4` extension since the
/// muxed output replaces the playlist. `fallback_stem` names the file when the
/// url has no usable segment.
pub fn filename_from_url(url: &str, fallback_stem: &str, assembled: bool) -> Result<String> {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_stem.to_string());

    let name = if assembled {
        let stem = segment
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&segment);
        format!("{}.{}", stem, ASSEMBLED_EXTENSION)
    } else {
        segment
    };

    sanitize_filename(&name)
}
