//! Locating machine-readable payloads embedded in fetched pages.
//!
//! Pages carry their data in one of a few known embedding styles. [`locate`]
//! tries them in a fixed order and returns the matches of the first style
//! that yields anything, tagged with that style so the parser knows which
//! branch to take.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ExtractionError;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").unwrap());

static JSON_TYPE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)type\s*=\s*["']application/json["']"#).unwrap());

static RELAY_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)data-relay-response\s*=\s*["']true["']"#).unwrap());

static INITIAL_PROPS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"id\s*=\s*["']__PWS_INITIAL_PROPS__["']"#).unwrap());

static REQUEST_PARAMETERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']requestParameters["']\s*:"#).unwrap());

/// `Some.dotted.callee(` at the start of a script body.
static CALL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*\s*\(").unwrap()
});

static APP_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]appVersion['"]:['"](\w+?)['"]"#).unwrap());

static PROFILE_COVER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)['"]profile_cover['"]:\{['"]id['"]:['"](\d+?)['"]"#).unwrap());

static USERS_PINS_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/users/(\d+)/pins").unwrap());

/// Embedding style a payload was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// A JSON array of feed entries.
    FeedArray,
    /// An inline JSON script holding a single keyed pin record.
    DetailObject,
    /// A JSON argument passed to a JS call inside a script block.
    Wrapped,
}

/// A located payload, still unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub shape: PayloadShape,
    pub body: String,
}

impl RawPayload {
    fn new(shape: PayloadShape, body: impl Into<String>) -> Self {
        Self {
            shape,
            body: body.into(),
        }
    }
}

/// Find the structured payloads in a fetched page.
///
/// Shapes are tried in priority order (feed document, inline JSON script,
/// wrapped call argument). The first shape with at least one match wins and
/// its matches are returned; shapes are never merged.
pub fn locate(page: &str) -> Result<Vec<RawPayload>, ExtractionError> {
    let strategies: [fn(&str) -> Vec<RawPayload>; 3] =
        [locate_feed_array, locate_detail_objects, locate_wrapped];

    for strategy in strategies {
        let found = strategy(page);
        if !found.is_empty() {
            tracing::debug!(
                "Located {} payload(s) of shape {:?}",
                found.len(),
                found[0].shape
            );
            return Ok(found);
        }
    }

    Err(ExtractionError::NoPayload)
}

/// A whole-document JSON feed response, or a bare array of entries.
fn locate_feed_array(page: &str) -> Vec<RawPayload> {
    let trimmed = page.trim_start();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return Vec::new();
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Vec::new();
    };

    let data = match &value {
        Value::Array(_) => Some(&value),
        Value::Object(_) => value
            .pointer("/resource_response/data")
            .filter(|d| d.is_array()),
        _ => None,
    };

    data.map(|d| vec![RawPayload::new(PayloadShape::FeedArray, d.to_string())])
        .unwrap_or_default()
}

/// Inline `application/json` scripts carrying a pin record.
fn locate_detail_objects(page: &str) -> Vec<RawPayload> {
    SCRIPT_BLOCK
        .captures_iter(page)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let body = caps.get(2)?.as_str().trim();

            if !JSON_TYPE_ATTR.is_match(attrs) || body.is_empty() {
                return None;
            }

            if RELAY_ATTR.is_match(attrs) || REQUEST_PARAMETERS.is_match(body) {
                Some(RawPayload::new(PayloadShape::DetailObject, body))
            } else {
                None
            }
        })
        .collect()
}

/// Scripts whose body is a single call taking a JSON argument.
///
/// The argument may be an object/array literal or a string literal holding
/// escaped JSON (`JSON.parse("{\"a\":1}")`).
fn locate_wrapped(page: &str) -> Vec<RawPayload> {
    SCRIPT_BLOCK
        .captures_iter(page)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            if JSON_TYPE_ATTR.is_match(attrs) {
                return None;
            }
            unwrap_call_argument(caps.get(2)?.as_str())
        })
        .map(|body| RawPayload::new(PayloadShape::Wrapped, body))
        .collect()
}

/// Extract the JSON text of the sole argument of a script-level call.
fn unwrap_call_argument(script: &str) -> Option<String> {
    let prefix = CALL_PREFIX.find(script)?;
    let rest = script[prefix.end()..].trim_end();
    let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();
    let argument = rest.strip_suffix(')')?.trim();

    let value: Value = serde_json::from_str(argument).ok()?;
    match value {
        Value::String(inner) => {
            let decoded: Value = serde_json::from_str(&inner).ok()?;
            (decoded.is_object() || decoded.is_array()).then_some(inner)
        }
        Value::Object(_) | Value::Array(_) => Some(argument.to_string()),
        _ => None,
    }
}

/// The web app version token the resource endpoints expect.
pub fn find_app_version(page: &str) -> Option<String> {
    APP_VERSION
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The numeric user id of the profile a page belongs to.
///
/// Tried in order: the profile cover record, a `/users/<id>/pins` path, and
/// the first user key of the initial redux state.
pub fn find_user_id(page: &str) -> Option<String> {
    if let Some(id) = PROFILE_COVER_ID.captures(page).and_then(|c| c.get(1)) {
        return Some(id.as_str().to_string());
    }

    if let Some(id) = USERS_PINS_PATH.captures(page).and_then(|c| c.get(1)) {
        return Some(id.as_str().to_string());
    }

    SCRIPT_BLOCK.captures_iter(page).find_map(|caps| {
        if !INITIAL_PROPS_ATTR.is_match(caps.get(1)?.as_str()) {
            return None;
        }
        let props: Value = serde_json::from_str(caps.get(2)?.as_str().trim()).ok()?;
        props
            .pointer("/initialReduxState/users")?
            .as_object()?
            .keys()
            .find(|k| !k.is_empty())
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_document_yields_data_array() {
        let page = r#"{"resource_response":{"status":"success","data":[{"id":"1"},{"id":"2"}]}}"#;
        let found = locate(page).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape, PayloadShape::FeedArray);
        let data: Value = serde_json::from_str(&found[0].body).unwrap();
        assert_eq!(data.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_relay_script_is_detail_object() {
        let page = r#"<html><script data-relay-response="true" type="application/json">{"response":{"data":{"v3GetPinQuery":{"data":{"entityId":"1"}}}}}</script></html>"#;
        let found = locate(page).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape, PayloadShape::DetailObject);
        assert!(found[0].body.starts_with("{\"response\""));
    }

    #[test]
    fn test_request_parameters_script_is_detail_object() {
        let page = r#"<script nonce="x" type="application/json">{"requestParameters":{},"response":{"data":{}}}</script>"#;
        let found = locate(page).unwrap();
        assert_eq!(found[0].shape, PayloadShape::DetailObject);
    }

    #[test]
    fn test_unrelated_json_scripts_are_ignored() {
        let page = r#"<script type="application/json">{"theme":"dark"}</script>"#;
        assert_eq!(locate(page), Err(ExtractionError::NoPayload));
    }

    #[test]
    fn test_wrapped_object_argument() {
        let page = r#"<script>window.__init.start({"response":{"data":{"k":{"data":{}}}}});</script>"#;
        let found = locate(page).unwrap();
        assert_eq!(found[0].shape, PayloadShape::Wrapped);
        assert_eq!(found[0].body, r#"{"response":{"data":{"k":{"data":{}}}}}"#);
    }

    #[test]
    fn test_wrapped_escaped_string_argument() {
        let page = r#"<script>JSON.parse("{\"response\":{\"data\":{}}}")</script>"#;
        let found = locate(page).unwrap();
        assert_eq!(found[0].shape, PayloadShape::Wrapped);
        assert_eq!(found[0].body, r#"{"response":{"data":{}}}"#);
    }

    #[test]
    fn test_detail_wins_over_wrapped() {
        let page = concat!(
            r#"<script>init({"a":1})</script>"#,
            r#"<script data-relay-response="true" type="application/json">{"response":{}}</script>"#
        );
        let found = locate(page).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape, PayloadShape::DetailObject);
    }

    #[test]
    fn test_plain_page_has_no_payload() {
        let page = "<html><body>This pin was deleted</body></html>";
        assert_eq!(locate(page), Err(ExtractionError::NoPayload));
    }

    #[test]
    fn test_find_app_version() {
        let page = r#"..."appVersion":"a1b2c3d","other":1"#;
        assert_eq!(find_app_version(page), Some("a1b2c3d".to_string()));
        assert_eq!(find_app_version("nothing"), None);
    }

    #[test]
    fn test_find_user_id_from_profile_cover() {
        let page = r#""profile_cover":{"id":"998877","images":{}}"#;
        assert_eq!(find_user_id(page), Some("998877".to_string()));
    }

    #[test]
    fn test_find_user_id_from_pins_path() {
        let page = r#"<link href="https://api.example.com/v3/users/5566/pins/">"#;
        assert_eq!(find_user_id(page), Some("5566".to_string()));
    }

    #[test]
    fn test_find_user_id_from_initial_props() {
        let page = r#"<script id="__PWS_INITIAL_PROPS__" type="application/json">{"initialReduxState":{"users":{"":{},"424242":{"username":"x"}}}}</script>"#;
        assert_eq!(find_user_id(page), Some("424242".to_string()));
    }
}
