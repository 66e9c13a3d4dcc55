//! The paged listing boundary the feed paginator drives.

use async_trait::async_trait;

use crate::api::types::{ResourceResponse, SessionConfig};
use crate::error::Result;

/// A source of creator feed pages.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Resolve the session tokens the listing endpoint requires.
    async fn session_config(&self, username: &str) -> Result<SessionConfig>;

    /// Fetch one page of a creator's pins, continuing from `bookmark` when given.
    async fn user_pins_page(
        &self,
        session: &SessionConfig,
        username: &str,
        bookmark: Option<&str>,
    ) -> Result<ResourceResponse>;
}
