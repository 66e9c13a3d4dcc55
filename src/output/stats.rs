//! Statistics reporting.

use std::time::Duration;

use console::style;

use crate::download::DownloadState;

/// Print the statistics of a finished run.
pub fn print_run_stats(state: &DownloadState, elapsed: Duration) {
    let username = state.username.as_deref().unwrap_or("unknown");

    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style(format!("Statistics for @{}:", username)).bold());
    println!("  Images:   {}", state.image_count);
    println!("  Videos:   {}", state.video_count);
    println!("  Skipped:  {} (already downloaded)", state.skipped_count);
    if state.has_failures() {
        println!("  Failed:   {}", style(state.failed_count).red());
        for id in &state.failed_items {
            println!("    - {}", id);
        }
    }
    println!("  Total:    {} downloaded", state.total_downloaded());
    println!("  Elapsed:  {:.1}s", elapsed.as_secs_f64());
    println!("{}", style("═".repeat(50)).dim());
}
