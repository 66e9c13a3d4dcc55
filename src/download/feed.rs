//! Creator feed pagination and downloading.

use std::collections::HashSet;

use rand::Rng;
use serde_json::Value;

use crate::api::{FeedSource, PinterestApi, SessionConfig};
use crate::config::{Config, MetadataSource};
use crate::download::cancel::CancelContext;
use crate::download::media::download_media_item;
use crate::download::mux::Muxer;
use crate::download::state::DownloadState;
use crate::error::{Error, FeedError, Result};
use crate::fs::{find_cached, save_user_metadata};
use crate::media::parser::{feed_author, normalize_feed_entries};
use crate::media::{AuthorIdentity, MediaItem, MetadataDocument};
use crate::output::{create_spinner, print_author_summary};

/// Random pause between downloads, in milliseconds.
const ITEM_DELAY_MS: std::ops::RangeInclusive<u64> = 400..=750;

/// Where a paginator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Init,
    FetchingConfig,
    FetchingPage,
    Accumulating,
    Done,
    Failed,
}

/// Why a successful run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStop {
    /// The last page carried no bookmark.
    EndOfFeed,
    /// The page budget was used up first.
    BudgetExhausted,
}

/// Items of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedResult {
    pub author: AuthorIdentity,
    pub items: Vec<MediaItem>,
    pub pages_fetched: u32,
    pub stop: FeedStop,
}

/// One normalized page.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<MediaItem>,
    pub author: Option<AuthorIdentity>,
    pub bookmark: Option<String>,
}

/// Pages through a creator's pins, carrying the bookmark forward.
///
/// The session config is fetched once and reused for every page. Items are
/// kept in feed order; a pin seen on an earlier page is not added again.
pub struct FeedPaginator<'a, S: FeedSource + ?Sized> {
    source: &'a S,
    username: String,
    page_budget: u32,
    state: FeedState,
    session: Option<SessionConfig>,
}

impl<'a, S: FeedSource + ?Sized> FeedPaginator<'a, S> {
    pub fn new(source: &'a S, username: impl Into<String>, page_budget: u32) -> Self {
        Self {
            source,
            username: username.into(),
            page_budget,
            state: FeedState::Init,
            session: None,
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Resolve the session config, fetching it on first use only.
    pub async fn session(&mut self) -> Result<SessionConfig> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        self.state = FeedState::FetchingConfig;
        let session = self
            .source
            .session_config(&self.username)
            .await
            .map_err(|e| match e {
                Error::Feed(e) => Error::Feed(e),
                other => FeedError::ConfigUnresolved {
                    username: self.username.clone(),
                    reason: other.to_string(),
                }
                .into(),
            });

        match session {
            Ok(session) => {
                self.session = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                self.state = FeedState::Failed;
                Err(e)
            }
        }
    }

    /// Fetch and normalize the page after `bookmark`.
    ///
    /// `page_no` is 1-based and only used in error reports.
    pub async fn fetch_page(&mut self, bookmark: Option<&str>, page_no: u32) -> Result<FeedPage> {
        let session = self.session().await?;
        self.state = FeedState::FetchingPage;

        let result = fetch_feed_page(self.source, &session, &self.username, bookmark, page_no).await;
        if result.is_err() {
            self.state = FeedState::Failed;
        }
        result
    }

    /// Run to the end of the feed or the page budget.
    ///
    /// Any failure discards what was accumulated.
    pub async fn run(&mut self) -> Result<FeedResult> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut author = None;
        let mut bookmark: Option<String> = None;
        let mut pages_fetched = 0;

        if self.page_budget == 0 {
            self.state = FeedState::Done;
            return Ok(FeedResult {
                author: self.fallback_author(),
                items,
                pages_fetched,
                stop: FeedStop::BudgetExhausted,
            });
        }

        let stop = loop {
            let page = self.fetch_page(bookmark.as_deref(), pages_fetched + 1).await?;
            pages_fetched += 1;
            self.state = FeedState::Accumulating;

            tracing::info!(
                "Page {}: {} pins for @{}",
                pages_fetched,
                page.items.len(),
                self.username
            );

            if pages_fetched == 1 {
                author = page.author;
            }
            for item in page.items {
                if seen.insert(item.pin_id.clone()) {
                    items.push(item);
                } else {
                    tracing::debug!("Skipping repeated pin {}", item.pin_id);
                }
            }

            match page.bookmark {
                None => break FeedStop::EndOfFeed,
                Some(_) if pages_fetched >= self.page_budget => break FeedStop::BudgetExhausted,
                next => bookmark = next,
            }
        };

        self.state = FeedState::Done;
        Ok(FeedResult {
            author: author.unwrap_or_else(|| self.fallback_author()),
            items,
            pages_fetched,
            stop,
        })
    }

    fn fallback_author(&self) -> AuthorIdentity {
        AuthorIdentity {
            username: self.username.clone(),
            display_name: self.username.clone(),
            user_id: self
                .session
                .as_ref()
                .map(|s| s.user_id.clone())
                .unwrap_or_default(),
        }
    }
}

/// Fetch one page from `source` and normalize its entries.
pub async fn fetch_feed_page<S: FeedSource + ?Sized>(
    source: &S,
    session: &SessionConfig,
    username: &str,
    bookmark: Option<&str>,
    page_no: u32,
) -> Result<FeedPage> {
    let page_failed = |reason: String| -> Error {
        FeedError::PageFetchFailed {
            username: username.to_string(),
            page: page_no,
            reason,
        }
        .into()
    };

    let response = source
        .user_pins_page(session, username, bookmark)
        .await
        .map_err(|e| match e {
            Error::Feed(e) => Error::Feed(e),
            other => page_failed(other.to_string()),
        })?;

    if !response.is_success() {
        return Err(page_failed(format!(
            "status={} code={} message={}",
            response.status, response.code, response.message
        )));
    }

    let entries: &[Value] = match &response.data {
        Value::Null => &[],
        Value::Array(entries) => entries,
        other => {
            return Err(FeedError::SchemaMismatch {
                username: username.to_string(),
                reason: format!("expected a list of pins, got {}", json_kind(other)),
            }
            .into())
        }
    };

    let items = normalize_feed_entries(entries).map_err(|e| FeedError::SchemaMismatch {
        username: username.to_string(),
        reason: e.to_string(),
    })?;

    Ok(FeedPage {
        items,
        author: feed_author(entries),
        bookmark: response.next_bookmark().map(str::to_string),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Download every pin of `username` matching the configured media type.
///
/// Items are downloaded one at a time. A failed item is recorded in the
/// returned state and the run moves on.
pub async fn download_user_feed(
    api: &PinterestApi,
    muxer: &Muxer,
    config: &Config,
    cancel: &CancelContext,
    username: &str,
    source: &MetadataSource,
) -> Result<DownloadState> {
    let root = config.output_directory();

    let document = match source {
        MetadataSource::Cache(key) => {
            tracing::info!("Using cached metadata for {}", key);
            find_cached(&root, key)?.ok_or_else(|| Error::CacheMiss(key.to_string()))?
        }
        MetadataSource::Live => {
            let spinner = config
                .options
                .show_progress
                .then(|| create_spinner(&format!("Fetching pins of @{}", username)));

            let mut paginator = FeedPaginator::new(api, username, config.options.pages);
            let result = paginator.run().await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let result = result?;

            tracing::info!(
                "Collected {} pins from {} pages ({:?})",
                result.items.len(),
                result.pages_fetched,
                result.stop
            );

            let document = MetadataDocument {
                author: result.author,
                items: result.items,
            };
            if config.options.save_metadata {
                save_user_metadata(&root, &document, config.options.overwrite)?;
            }
            document
        }
    };

    print_author_summary(&document.author, &document.items);

    let media_type = config.options.media_type;
    let selected: Vec<&MediaItem> = document
        .items
        .iter()
        .filter(|item| item.url_for(media_type).is_some())
        .collect();
    tracing::info!("Downloading {} {}", selected.len(), media_type.folder_name());

    let mut state = DownloadState::new(&document.author.username);

    for (index, item) in selected.iter().enumerate() {
        if index > 0 {
            let delay = rand::thread_rng().gen_range(ITEM_DELAY_MS);
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        tracing::info!("[{}/{}] pin {}", index + 1, selected.len(), item.pin_id);
        let result = download_media_item(
            api,
            muxer,
            config,
            &mut state,
            cancel,
            &document.author,
            item,
            media_type,
        )
        .await;

        if let Err(e) = result {
            tracing::error!("Pin {} failed: {}", item.pin_id, e);
            state.mark_failed(&item.pin_id);
        }
    }

    Ok(state)
}
