//! Download mode definitions.

use std::fmt;
use std::str::FromStr;

/// What a run downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadMode {
    /// Page through a creator's feed.
    User { username: String },
    /// Download a single pin by id or url.
    Pin { pin: String },
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadMode::User { username } => write!(f, "user @{}", username),
            DownloadMode::Pin { pin } => write!(f, "pin {}", pin),
        }
    }
}

/// Where pin metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MetadataSource {
    /// Fetch from the site.
    #[default]
    Live,
    /// Reuse a previously saved metadata document.
    Cache(CacheKey),
}

/// Lookup key for saved metadata.
///
/// All-digit keys name a pin, anything else names a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    Username(String),
    PinId(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Username(u) => write!(f, "@{}", u),
            CacheKey::PinId(id) => write!(f, "pin {}", id),
        }
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().trim_start_matches('@');
        if key.is_empty() {
            return Err("Cache key must not be empty".to_string());
        }

        if key.chars().all(|c| c.is_ascii_digit()) {
            Ok(CacheKey::PinId(key.to_string()))
        } else {
            Ok(CacheKey::Username(key.to_string()))
        }
    }
}
