//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars
//! - Statistics reporting

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_author_summary, print_banner, print_config_summary, print_error, print_pin_summary,
    print_warning,
};
pub use progress::{create_download_bar, create_spinner};
pub use stats::print_run_stats;
