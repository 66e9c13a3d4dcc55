//! API request/response type definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bookmark value some endpoints send in place of omitting it on the last page.
const END_BOOKMARK: &str = "-end-";

/// Per-run tokens the resource endpoints require.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub app_version: String,
    pub user_id: String,
}

/// Envelope of every `/resource/.../get/` response.
#[derive(Debug, Deserialize)]
pub struct ResourceEnvelope {
    pub resource_response: ResourceResponse,
}

/// Resource response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub bookmark: Option<String>,
}

impl ResourceResponse {
    /// `status == "success"`, `code == 0` and `message == "ok"`.
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
            && self.code == 0
            && self.message.eq_ignore_ascii_case("ok")
    }

    /// Continuation token for the next page, `None` at the end of the feed.
    pub fn next_bookmark(&self) -> Option<&str> {
        self.bookmark
            .as_deref()
            .filter(|b| !b.is_empty() && *b != END_BOOKMARK)
    }
}

/// The `data` query parameter of a user pins request.
#[derive(Debug, Serialize)]
pub struct FeedQuery<'a> {
    pub options: FeedOptions<'a>,
    pub context: serde_json::Map<String, Value>,
}

/// Listing options of a user pins request.
#[derive(Debug, Serialize)]
pub struct FeedOptions<'a> {
    pub exclude_add_pin_rep: bool,
    pub field_set_key: &'a str,
    pub is_own_profile_pins: bool,
    pub redux_normalize_feed: bool,
    pub user_id: &'a str,
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<Vec<&'a str>>,
}

impl<'a> FeedQuery<'a> {
    pub fn new(user_id: &'a str, username: &'a str, bookmark: Option<&'a str>) -> Self {
        Self {
            options: FeedOptions {
                exclude_add_pin_rep: true,
                field_set_key: "grid_item",
                is_own_profile_pins: false,
                redux_normalize_feed: true,
                user_id,
                username,
                bookmarks: bookmark.map(|b| vec![b]),
            },
            context: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_all_three_fields() {
        let mut response = ResourceResponse {
            status: "success".into(),
            code: 0,
            message: "ok".into(),
            ..Default::default()
        };
        assert!(response.is_success());

        response.code = 1;
        assert!(!response.is_success());

        response.code = 0;
        response.message = "Not found".into();
        assert!(!response.is_success());
    }

    #[test]
    fn test_next_bookmark() {
        let mut response = ResourceResponse::default();
        assert_eq!(response.next_bookmark(), None);

        response.bookmark = Some("b1".into());
        assert_eq!(response.next_bookmark(), Some("b1"));

        response.bookmark = Some("-end-".into());
        assert_eq!(response.next_bookmark(), None);
    }

    #[test]
    fn test_feed_query_serialization() {
        let first = serde_json::to_value(FeedQuery::new("777", "artist", None)).unwrap();
        assert_eq!(first["options"]["user_id"], "777");
        assert_eq!(first["options"]["field_set_key"], "grid_item");
        assert!(first["options"].get("bookmarks").is_none());
        assert_eq!(first["context"], serde_json::json!({}));

        let next = serde_json::to_value(FeedQuery::new("777", "artist", Some("b1"))).unwrap();
        assert_eq!(next["options"]["bookmarks"], serde_json::json!(["b1"]));
    }

    #[test]
    fn test_envelope_without_bookmark() {
        let text = r#"{"resource_response":{"status":"success","code":0,"message":"ok","data":[]}}"#;
        let envelope: ResourceEnvelope = serde_json::from_str(text).unwrap();
        assert!(envelope.resource_response.is_success());
        assert_eq!(envelope.resource_response.next_bookmark(), None);
    }
}
