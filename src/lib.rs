//! Pinterest Downloader - download media from Pinterest creators and pins.
//!
//! # Features
//!
//! - Page through a creator's pins with a page budget
//! - Download a single pin by url, pin.it short link, or id
//! - Extract pin metadata from embedded page payloads
//! - Pick the best HLS variant and mux it with its audio into MP4
//! - Save and reuse metadata documents
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use pinterest_downloader::config::MetadataSource;
//! use pinterest_downloader::download::{download_user_feed, CancelContext, Muxer};
//! use pinterest_downloader::{Config, PinterestApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let api = PinterestApi::new(&config.site, config.retry)?;
//!     let muxer = Muxer::new(&config.muxer.ffmpeg_path);
//!     let cancel = CancelContext::new();
//!
//!     let state = download_user_feed(
//!         &api,
//!         &muxer,
//!         &config,
//!         &cancel,
//!         "someone",
//!         &MetadataSource::Live,
//!     )
//!     .await?;
//!     println!("{} files", state.total_downloaded());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;

// Re-exports for convenience
pub use api::PinterestApi;
pub use config::{Config, DownloadMode};
pub use download::{download_single_pin, download_user_feed, DownloadState};
pub use error::{Error, Result};
pub use media::{MediaItem, MediaType};
