//! Normalizing located payloads into media items.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::ExtractionError;
use crate::media::item::{AuthorIdentity, MediaItem, VideoDescriptor};
use crate::media::locator::{PayloadShape, RawPayload};

/// Normalized rendition key of the progressive (single file) 720p video.
const PROGRESSIVE_KEY: &str = "v720p";

/// Normalized prefix of HLS manifest renditions (`V_HLSV4`, `vHLSV3MOBILE`, ...).
const HLS_KEY_PREFIX: &str = "vhls";

/// Placeholder for identity fields the payload leaves out.
const UNKNOWN: &str = "-";

/// Items and author recovered from one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    pub author: Option<AuthorIdentity>,
    pub items: Vec<MediaItem>,
}

/// Parse a located payload into media items.
pub fn normalize(payload: &RawPayload) -> Result<NormalizedPayload, ExtractionError> {
    let value: Value = serde_json::from_str(&payload.body)
        .map_err(|e| ExtractionError::MalformedPayload(e.to_string()))?;

    match payload.shape {
        PayloadShape::FeedArray => normalize_feed_value(&value),
        PayloadShape::DetailObject => normalize_detail(&value),
        PayloadShape::Wrapped => {
            if value.is_array() || value.pointer("/resource_response/data").is_some() {
                normalize_feed_value(&value)
            } else {
                normalize_detail(&value)
            }
        }
    }
}

fn normalize_feed_value(value: &Value) -> Result<NormalizedPayload, ExtractionError> {
    let entries = value
        .as_array()
        .or_else(|| {
            value
                .pointer("/resource_response/data")
                .and_then(Value::as_array)
        })
        .ok_or_else(|| ExtractionError::MalformedPayload("feed payload is not an array".into()))?;

    Ok(NormalizedPayload {
        author: feed_author(entries),
        items: normalize_feed_entries(entries)?,
    })
}

/// Map feed entries to items, one item per entry, in order.
///
/// Entries without any `images` or `videos` field still produce an item with
/// both media fields empty so positions line up with the page.
pub fn normalize_feed_entries(entries: &[Value]) -> Result<Vec<MediaItem>, ExtractionError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = entry.as_object().ok_or_else(|| {
                ExtractionError::MalformedPayload(format!("feed entry {} is not an object", index))
            })?;
            let pin_id = id_string(entry.get("id")).ok_or_else(|| {
                ExtractionError::MalformedPayload(format!("feed entry {} has no id", index))
            })?;

            Ok(MediaItem {
                title: text(entry.get("title"))
                    .or_else(|| text(entry.get("grid_title")))
                    .unwrap_or_default(),
                pin_id,
                upload_date: parse_timestamp(entry.get("created_at")),
                image_url: text(pointer(entry, "/images/orig/url")),
                video: pointer(entry, "/videos/video_list")
                    .and_then(Value::as_object)
                    .and_then(select_video),
            })
        })
        .collect()
}

/// The creator of the first feed entry that names one.
pub fn feed_author(entries: &[Value]) -> Option<AuthorIdentity> {
    entries.iter().find_map(|entry| {
        let creator = entry.get("native_creator")?.as_object()?;
        Some(AuthorIdentity {
            username: text(creator.get("username"))?,
            display_name: text(creator.get("full_name")).unwrap_or_else(|| UNKNOWN.into()),
            user_id: id_string(creator.get("id")).unwrap_or_else(|| UNKNOWN.into()),
        })
    })
}

fn normalize_detail(value: &Value) -> Result<NormalizedPayload, ExtractionError> {
    let record = detail_record(value)?;

    let item = MediaItem {
        title: text(record.get("title")).unwrap_or_else(|| UNKNOWN.into()),
        pin_id: id_string(record.get("entityId"))
            .or_else(|| id_string(record.get("id")))
            .unwrap_or_default(),
        upload_date: parse_timestamp(record.get("createdAt")),
        image_url: text(pointer(record, "/imageSpec_orig/url")),
        video: pointer(record, "/videos/videoList")
            .and_then(Value::as_object)
            .and_then(select_video),
    };

    if !item.has_media() {
        return Err(ExtractionError::NoMedia);
    }

    Ok(NormalizedPayload {
        author: detail_author(record),
        items: vec![item],
    })
}

/// The record held by the sole entry of a per-request keyed object.
///
/// Detail payloads look like `{"response":{"data":{"<opaque key>":{"data":{..}}}}}`;
/// the key changes between requests so it is never matched by name.
fn detail_record(value: &Value) -> Result<&Map<String, Value>, ExtractionError> {
    let keyed = value
        .pointer("/response/data")
        .unwrap_or(value)
        .as_object()
        .ok_or_else(|| ExtractionError::MalformedPayload("expected a keyed object".into()))?;

    if keyed.len() > 1 {
        tracing::debug!("Keyed payload has {} entries, using the first", keyed.len());
    }

    let (key, entry) = keyed
        .iter()
        .next()
        .ok_or_else(|| ExtractionError::MalformedPayload("keyed object is empty".into()))?;
    tracing::debug!("Using payload record under key {}", key);

    entry
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| entry.as_object())
        .ok_or(ExtractionError::NoMedia)
}

fn detail_author(record: &Map<String, Value>) -> Option<AuthorIdentity> {
    let pinner = record
        .get("originPinner")
        .filter(|p| p.is_object())
        .or_else(|| record.get("pinner"))?
        .as_object()?;

    Some(AuthorIdentity {
        username: text(pinner.get("username")).unwrap_or_else(|| UNKNOWN.into()),
        display_name: text(pinner.get("fullName"))
            .or_else(|| text(pointer(record, "/closeupAttribution/fullName")))
            .unwrap_or_else(|| UNKNOWN.into()),
        user_id: id_string(pinner.get("entityId")).unwrap_or_else(|| UNKNOWN.into()),
    })
}

/// Pick the rendition an item is downloaded from.
///
/// A progressive 720p file wins; otherwise the largest HLS manifest is used
/// and flagged for stream assembly; otherwise there is no usable video.
fn select_video(list: &Map<String, Value>) -> Option<VideoDescriptor> {
    let mut best_hls: Option<VideoDescriptor> = None;

    for (key, rendition) in list {
        let key = normalize_key(key);
        if key == PROGRESSIVE_KEY {
            if let Some(descriptor) = descriptor(rendition, false) {
                return Some(descriptor);
            }
        } else if key.starts_with(HLS_KEY_PREFIX) {
            if let Some(candidate) = descriptor(rendition, true) {
                let area = |d: &VideoDescriptor| u64::from(d.width) * u64::from(d.height);
                if best_hls.as_ref().map_or(true, |b| area(&candidate) > area(b)) {
                    best_hls = Some(candidate);
                }
            }
        }
    }

    best_hls
}

fn descriptor(rendition: &Value, needs_stream_assembly: bool) -> Option<VideoDescriptor> {
    let rendition = rendition.as_object()?;
    let dimension = |field: &str| {
        rendition
            .get(field)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    };

    Some(VideoDescriptor {
        url: text(rendition.get("url"))?,
        width: dimension("width"),
        height: dimension("height"),
        // Durations are reported in milliseconds.
        duration_seconds: rendition
            .get("duration")
            .and_then(Value::as_f64)
            .map(|ms| ms / 1000.0)
            .unwrap_or(0.0),
        thumbnail_url: text(rendition.get("thumbnail")),
        needs_stream_assembly,
    })
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn pointer<'a>(object: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let (head, tail) = path.trim_start_matches('/').split_once('/')?;
    object.get(head)?.pointer(&format!("/{}", tail))
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc2822(s)
            .or_else(|_| DateTime::parse_from_rfc3339(s))
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(shape: PayloadShape, value: Value) -> RawPayload {
        RawPayload {
            shape,
            body: value.to_string(),
        }
    }

    fn feed_entry(id: &str) -> Value {
        json!({
            "id": id,
            "title": format!("pin {}", id),
            "created_at": "Tue, 06 May 2025 12:34:56 +0000",
            "images": {"orig": {"url": format!("https://i.pinimg.com/originals/{}.jpg", id)}},
            "native_creator": {"username": "artist", "full_name": "The Artist", "id": "777"}
        })
    }

    #[test]
    fn test_detail_record_under_opaque_key() {
        let value = json!({
            "42abc": {
                "entityId": "1234567890123456",
                "title": "sunset",
                "imageSpec_orig": {"url": "https://i.pinimg.com/originals/sunset.jpg"},
                "pinner": {"username": "artist", "fullName": "The Artist", "entityId": "777"}
            }
        });
        let result = normalize(&payload(PayloadShape::DetailObject, value)).unwrap();
        let item = &result.items[0];
        assert_eq!(item.pin_id, "1234567890123456");
        assert_eq!(item.title, "sunset");
        assert_eq!(
            item.image_url.as_deref(),
            Some("https://i.pinimg.com/originals/sunset.jpg")
        );
        assert_eq!(result.author.unwrap().username, "artist");
    }

    #[test]
    fn test_detail_record_inside_response_envelope() {
        let value = json!({
            "response": {"data": {"v3GetPinQuery": {"data": {
                "entityId": "55",
                "videos": {"videoList": {
                    "v720P": {"url": "https://v1.pinimg.com/videos/720p/a.mp4", "width": 720, "height": 1280, "duration": 15000}
                }},
                "pinner": {"username": "p", "entityId": "1"},
                "originPinner": {"username": "origin", "fullName": "Origin", "entityId": "2"}
            }}}}
        });
        let result = normalize(&payload(PayloadShape::DetailObject, value)).unwrap();
        let video = result.items[0].video.as_ref().unwrap();
        assert!(!video.needs_stream_assembly);
        assert_eq!(video.duration_seconds, 15.0);
        assert_eq!(result.author.unwrap().username, "origin");
    }

    #[test]
    fn test_progressive_wins_over_hls() {
        let list = json!({
            "V_HLSV4": {"url": "https://v1.pinimg.com/videos/hls/a.m3u8", "width": 1080, "height": 1920},
            "V_720P": {"url": "https://v1.pinimg.com/videos/720p/a.mp4", "width": 720, "height": 1280}
        });
        let video = select_video(list.as_object().unwrap()).unwrap();
        assert!(!video.needs_stream_assembly);
        assert!(video.url.ends_with(".mp4"));
    }

    #[test]
    fn test_hls_only_needs_stream_assembly() {
        let list = json!({
            "V_HLSV3_MOBILE": {"url": "https://v1.pinimg.com/videos/hls/small.m3u8", "width": 240, "height": 426},
            "V_HLSV4": {"url": "https://v1.pinimg.com/videos/hls/a.m3u8", "width": 720, "height": 1280, "thumbnail": "https://i.pinimg.com/t.jpg"}
        });
        let video = select_video(list.as_object().unwrap()).unwrap();
        assert!(video.needs_stream_assembly);
        assert_eq!(video.url, "https://v1.pinimg.com/videos/hls/a.m3u8");
        assert_eq!(video.thumbnail_url.as_deref(), Some("https://i.pinimg.com/t.jpg"));
    }

    #[test]
    fn test_unknown_renditions_yield_no_video() {
        let list = json!({"V_EXP3": {"url": "https://v1.pinimg.com/x.mp4"}});
        assert!(select_video(list.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_feed_entries_keep_positions() {
        let entries = vec![feed_entry("1"), json!({"id": "2", "title": "story pin"}), feed_entry("3")];
        let items = normalize_feed_entries(&entries).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].pin_id, "2");
        assert!(items[1].image_url.is_none());
        assert!(items[1].video.is_none());
        assert!(items[0].upload_date.is_some());
    }

    #[test]
    fn test_feed_author_from_native_creator() {
        let author = feed_author(&[feed_entry("1")]).unwrap();
        assert_eq!(
            author,
            AuthorIdentity {
                username: "artist".into(),
                display_name: "The Artist".into(),
                user_id: "777".into(),
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        let raw = RawPayload {
            shape: PayloadShape::DetailObject,
            body: "{not json".into(),
        };
        assert!(matches!(
            normalize(&raw),
            Err(ExtractionError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_detail_without_media_is_no_media() {
        let value = json!({"k": {"data": {"entityId": "9", "title": "text only"}}});
        assert_eq!(
            normalize(&payload(PayloadShape::DetailObject, value)),
            Err(ExtractionError::NoMedia)
        );
    }

    #[test]
    fn test_deleted_pin_is_no_media() {
        let value = json!({"response": {"data": {"v3GetPinQuery": {"data": null}}}});
        assert_eq!(
            normalize(&payload(PayloadShape::DetailObject, value)),
            Err(ExtractionError::NoMedia)
        );
    }

    #[test]
    fn test_wrapped_feed_document() {
        let value = json!({"resource_response": {"data": [feed_entry("1")]}});
        let result = normalize(&payload(PayloadShape::Wrapped, value)).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.author.unwrap().user_id, "777");
    }

    #[test]
    fn test_feed_entry_without_id_is_malformed() {
        let entries = vec![json!({"title": "no id"})];
        assert!(matches!(
            normalize_feed_entries(&entries),
            Err(ExtractionError::MalformedPayload(_))
        ));
    }
}
