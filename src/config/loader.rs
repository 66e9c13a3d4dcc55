//! Configuration structures and loading logic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::media::MediaType;

/// Folder created under the output root's parent for all downloads.
const OUTPUT_FOLDER: &str = "pinterest-downloader-output";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub muxer: MuxerConfig,
}

/// Site access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root, e.g. `https://id.pinterest.com`.
    #[serde(default = "default_host")]
    pub host: String,

    /// Browser user agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

/// Download options configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Root directory for downloads.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    /// Which media of each pin to download.
    #[serde(default)]
    pub media_type: MediaType,

    /// Maximum number of feed pages fetched per user.
    #[serde(default = "default_pages")]
    pub pages: u32,

    /// Rewrite files that already exist.
    #[serde(default)]
    pub overwrite: bool,

    /// Save the collected metadata as JSON next to the media.
    #[serde(default)]
    pub save_metadata: bool,

    /// Whether to show download progress.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            media_type: MediaType::default(),
            pages: default_pages(),
            overwrite: false,
            save_metadata: false,
            show_progress: true,
        }
    }
}

/// Retry policy for transient HTTP failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Back-off before the attempt following `attempt` (1-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// External muxer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxerConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

fn default_host() -> String {
    "https://id.pinterest.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_pages() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("Configuration file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the effective output root.
    pub fn output_directory(&self) -> PathBuf {
        self.options.output_directory.clone().unwrap_or_else(|| {
            directories::UserDirs::new()
                .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(OUTPUT_FOLDER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.site.host, "https://id.pinterest.com");
        assert_eq!(config.options.pages, 50);
        assert_eq!(config.options.media_type, MediaType::Image);
        assert!(!config.options.overwrite);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.muxer.ffmpeg_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [options]
            media_type = "video"
            pages = 3
            output_directory = "/data/pins"

            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.options.media_type, MediaType::Video);
        assert_eq!(config.options.pages, 3);
        assert!(config.options.show_progress);
        assert_eq!(config.output_directory(), PathBuf::from("/data/pins"));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 500);
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let retry = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 3000,
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(500));
        assert_eq!(retry.delay_for(2), Duration::from_millis(1000));
        assert_eq!(retry.delay_for(3), Duration::from_millis(2000));
        assert_eq!(retry.delay_for(4), Duration::from_millis(3000));
        assert_eq!(retry.delay_for(60), Duration::from_millis(3000));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[options]\npages = 7\n").unwrap();

        assert_eq!(Config::load(&path).unwrap().options.pages, 7);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
