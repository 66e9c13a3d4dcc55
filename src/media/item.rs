//! Media item representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media asset a run downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    /// Get the folder name for this media type.
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaType::Image => "images",
            MediaType::Video => "videos",
        }
    }
}

/// The creator a feed or pin belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorIdentity {
    pub username: String,
    pub display_name: String,
    pub user_id: String,
}

/// A playable video rendition.
///
/// When `needs_stream_assembly` is set, `url` points at an HLS master playlist
/// rather than a single downloadable file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub thumbnail_url: Option<String>,
    pub needs_stream_assembly: bool,
}

/// One pin, normalized from either a feed entry or a pin detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub title: String,
    pub pin_id: String,
    pub upload_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub video: Option<VideoDescriptor>,
}

impl MediaItem {
    /// Whether this item carries any downloadable media at all.
    pub fn has_media(&self) -> bool {
        self.image_url.is_some() || self.video.is_some()
    }

    /// Source URL for the requested media type.
    ///
    /// Images fall back to the video thumbnail when the pin has no still.
    pub fn url_for(&self, media_type: MediaType) -> Option<&str> {
        match media_type {
            MediaType::Video => self.video.as_ref().map(|v| v.url.as_str()),
            MediaType::Image => self.image_url.as_deref().or_else(|| {
                self.video
                    .as_ref()
                    .and_then(|v| v.thumbnail_url.as_deref())
            }),
        }
    }

    /// Whether downloading `media_type` requires manifest assembly.
    pub fn needs_stream_assembly(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Video
            && self
                .video
                .as_ref()
                .is_some_and(|v| v.needs_stream_assembly)
    }
}

/// A run's worth of metadata: one author and the items collected for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub author: AuthorIdentity,
    pub items: Vec<MediaItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(needs_stream_assembly: bool) -> VideoDescriptor {
        VideoDescriptor {
            url: "https://v1.pinimg.com/videos/mc/hls/ab/cd/ef/abcdef.m3u8".into(),
            width: 720,
            height: 1280,
            duration_seconds: 12.5,
            thumbnail_url: Some("https://i.pinimg.com/videos/thumbnails/abcdef.jpg".into()),
            needs_stream_assembly,
        }
    }

    fn item(image_url: Option<&str>, video: Option<VideoDescriptor>) -> MediaItem {
        MediaItem {
            title: "title".into(),
            pin_id: "1234567890123456".into(),
            upload_date: None,
            image_url: image_url.map(String::from),
            video,
        }
    }

    #[test]
    fn test_image_falls_back_to_thumbnail() {
        let item = item(None, Some(video(false)));
        assert_eq!(
            item.url_for(MediaType::Image),
            Some("https://i.pinimg.com/videos/thumbnails/abcdef.jpg")
        );
    }

    #[test]
    fn test_image_prefers_original() {
        let item = item(Some("https://i.pinimg.com/originals/a.jpg"), Some(video(false)));
        assert_eq!(
            item.url_for(MediaType::Image),
            Some("https://i.pinimg.com/originals/a.jpg")
        );
    }

    #[test]
    fn test_stream_assembly_only_for_videos() {
        let item = item(Some("https://i.pinimg.com/originals/a.jpg"), Some(video(true)));
        assert!(item.needs_stream_assembly(MediaType::Video));
        assert!(!item.needs_stream_assembly(MediaType::Image));
    }

    #[test]
    fn test_item_without_media() {
        let item = item(None, None);
        assert!(!item.has_media());
        assert_eq!(item.url_for(MediaType::Video), None);
        assert_eq!(item.url_for(MediaType::Image), None);
    }
}
