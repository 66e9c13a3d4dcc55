//! Pinterest API module.
//!
//! This module provides:
//! - HTTP client with bounded retry
//! - Feed source abstraction used by pagination
//! - Trace id generation for resource requests
//! - API request/response types

pub mod client;
pub mod source;
pub mod trace;
pub mod types;

pub use client::PinterestApi;
pub use source::FeedSource;
pub use types::*;
