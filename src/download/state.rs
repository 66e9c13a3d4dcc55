//! Download state tracking.

/// Per-run download statistics.
#[derive(Debug, Default)]
pub struct DownloadState {
    pub username: Option<String>,

    // Statistics
    pub image_count: u64,
    pub video_count: u64,
    pub skipped_count: u64,
    pub failed_count: u64,

    /// Pin ids (or urls when no id is known) that failed, for re-running.
    pub failed_items: Vec<String>,
}

impl DownloadState {
    /// Create a new download state for a creator.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn increment_image(&mut self) {
        self.image_count += 1;
    }

    pub fn increment_video(&mut self) {
        self.video_count += 1;
    }

    pub fn increment_skipped(&mut self) {
        self.skipped_count += 1;
    }

    /// Record a per-item failure.
    pub fn mark_failed(&mut self, id: impl Into<String>) {
        self.failed_count += 1;
        self.failed_items.push(id.into());
    }

    /// Get total downloaded count.
    pub fn total_downloaded(&self) -> u64 {
        self.image_count + self.video_count
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut state = DownloadState::new("artist");
        state.increment_image();
        state.increment_video();
        state.increment_video();
        state.increment_skipped();
        assert_eq!(state.total_downloaded(), 3);
        assert!(!state.has_failures());

        state.mark_failed("1234567890123456");
        assert!(state.has_failures());
        assert_eq!(state.failed_items, vec!["1234567890123456".to_string()]);
    }
}
