//! Configuration module for the pinterest-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Download mode and cache key definitions
//! - Configuration and input validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{Config, MuxerConfig, OptionsConfig, RetryConfig, SiteConfig};
pub use modes::{CacheKey, DownloadMode, MetadataSource};
pub use validation::{parse_pin_ref, validate_config, validate_username, PinRef, PinRefFormat};
