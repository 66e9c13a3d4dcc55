//! Error types for the pinterest-downloader application.

use thiserror::Error;

/// Failures while locating or normalizing an embedded payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// None of the known embedding shapes matched the page.
    #[error("no structured payload found in page")]
    NoPayload,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The payload parsed, but carries none of the recognized media fields.
    #[error("payload contains no recognized media")]
    NoMedia,
}

/// Failures while paging through a creator feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("could not resolve session config for '{username}': {reason}")]
    ConfigUnresolved { username: String, reason: String },

    #[error("fetching page {page} for '{username}' failed: {reason}")]
    PageFetchFailed {
        username: String,
        page: u32,
        reason: String,
    },

    #[error("unexpected feed response for '{username}': {reason}")]
    SchemaMismatch { username: String, reason: String },
}

/// Failures while selecting renditions from an adaptive manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("no variants found in master playlist")]
    NoVariants,

    /// Informational only; a video-only selection is valid.
    #[error("no audio rendition found in master playlist")]
    NoAudioFound,

    #[error("failed to parse playlist: {0}")]
    Parse(String),
}

/// Failures while transferring a single media file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("transfer of {url} failed: {reason}")]
    TransferFailed { url: String, reason: String },

    #[error("no usable response for {url} (HTTP {status})")]
    NoResponse { url: String, status: u16 },
}

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid pin id or url: {0}")]
    InvalidPinRef(String),

    // Site errors
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Extraction failed for {id}: {source}")]
    Extraction {
        id: String,
        #[source]
        source: ExtractionError,
    },

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    // External tool errors
    #[error("ffmpeg failed ({}):\n{diagnostics}", exit_label(.exit_code))]
    Mux {
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("FFmpeg not found. Please install ffmpeg and ensure it's in your PATH.")]
    FFmpegNotFound,

    // Cache errors
    #[error("No cached metadata found for {0}")]
    CacheMiss(String),

    // File system errors
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| c.to_string())
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach the offending pin id or username to an extraction failure.
    pub fn extraction(id: impl Into<String>, source: ExtractionError) -> Self {
        Error::Extraction {
            id: id.into(),
            source,
        }
    }

    /// Whether a failed request is worth another attempt.
    ///
    /// Network failures, 5xx and 429 are transient; any other status is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Status { status, .. } => *status == 429 || *status >= 500,
            Error::Http(e) => {
                if let Some(status) = e.status() {
                    status.as_u16() == 429 || status.is_server_error()
                } else {
                    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
                }
            }
            _ => false,
        }
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_ITEMS_FAILED: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Error {
        Error::Status {
            url: "https://example.com".into(),
            status: code,
        }
    }

    #[test]
    fn test_status_retry_classification() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(403).is_retryable());
    }

    #[test]
    fn test_non_http_errors_are_final() {
        assert!(!Error::Config("bad".into()).is_retryable());
        assert!(!Error::extraction("123", ExtractionError::NoPayload).is_retryable());
    }

    #[test]
    fn test_extraction_message_carries_id() {
        let e = Error::extraction("42abc", ExtractionError::NoMedia);
        assert_eq!(
            e.to_string(),
            "Extraction failed for 42abc: payload contains no recognized media"
        );
    }

    #[test]
    fn test_mux_message_includes_diagnostics() {
        let e = Error::Mux {
            exit_code: Some(1),
            diagnostics: "Invalid data found".into(),
        };
        assert_eq!(e.to_string(), "ffmpeg failed (1):\nInvalid data found");
    }
}
