//! Download module for content downloading.
//!
//! This module provides:
//! - Download state tracking
//! - Creator feed pagination
//! - Single pin downloading
//! - Media file acquisition
//! - HLS variant selection and muxing
//! - Partial-file cleanup on interrupt

pub mod cancel;
pub mod feed;
pub mod hls;
pub mod media;
pub mod mux;
pub mod single;
pub mod state;

pub use cancel::CancelContext;
pub use feed::{download_user_feed, FeedPaginator, FeedResult, FeedState, FeedStop};
pub use hls::{select_audio, select_variant, Manifest};
pub use media::{acquire, download_media_item, Acquired, DownloadTask};
pub use mux::Muxer;
pub use single::{download_single_pin, fetch_pin};
pub use state::DownloadState;
