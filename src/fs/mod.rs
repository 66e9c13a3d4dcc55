//! Filesystem module.
//!
//! Provides:
//! - Path and directory management
//! - Filename sanitation
//! - Metadata persistence and cache lookup

pub mod metadata;
pub mod naming;
pub mod paths;

pub use metadata::{find_cached, save_pin_metadata, save_user_metadata};
pub use naming::{filename_from_url, sanitize_filename, sanitize_path_component};
pub use paths::{ensure_dir, media_dir, pin_metadata_dir, user_dir};
