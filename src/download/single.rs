//! Single pin download logic.

use crate::api::PinterestApi;
use crate::config::{parse_pin_ref, CacheKey, Config, MetadataSource, PinRef};
use crate::download::cancel::CancelContext;
use crate::download::media::download_media_item;
use crate::download::mux::Muxer;
use crate::download::state::DownloadState;
use crate::error::{Error, ExtractionError, Result};
use crate::fs::{find_cached, save_pin_metadata};
use crate::media::{locate, normalize, AuthorIdentity, MediaItem, MetadataDocument};
use crate::output::print_pin_summary;

/// Username used when a pin page names no pinner.
const UNKNOWN_USER: &str = "unknown";

/// Fetch a pin's detail page and normalize it.
///
/// Pages often embed payloads for related pins too, so the payload whose id
/// matches the reference is preferred over the first one with media.
pub async fn fetch_pin(api: &PinterestApi, pin: &PinRef) -> Result<(AuthorIdentity, MediaItem)> {
    tracing::debug!("Fetching pin page {}", pin.url);
    let page = api.get_text(&pin.url).await?;

    let payloads = locate(&page).map_err(|e| Error::extraction(&pin.id, e))?;
    tracing::debug!("Found {} payloads for {}", payloads.len(), pin.id);

    let mut fallback: Option<(Option<AuthorIdentity>, MediaItem)> = None;
    let mut last_error = ExtractionError::NoMedia;

    for payload in &payloads {
        let normalized = match normalize(payload) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::debug!("Skipping {:?} payload: {}", payload.shape, e);
                last_error = e;
                continue;
            }
        };

        for item in normalized.items.into_iter().filter(MediaItem::has_media) {
            if pin.pin_id() == Some(item.pin_id.as_str()) {
                return Ok(finish_pin(pin, normalized.author, item));
            }
            if fallback.is_none() {
                fallback = Some((normalized.author.clone(), item));
            }
        }
    }

    match fallback {
        Some((author, item)) => Ok(finish_pin(pin, author, item)),
        None => Err(Error::extraction(&pin.id, last_error)),
    }
}

fn finish_pin(
    pin: &PinRef,
    author: Option<AuthorIdentity>,
    mut item: MediaItem,
) -> (AuthorIdentity, MediaItem) {
    if item.pin_id.is_empty() {
        item.pin_id = pin.id.clone();
    }

    let author = author
        .filter(|a| !a.username.is_empty() && a.username != "-")
        .unwrap_or_else(|| AuthorIdentity {
            username: UNKNOWN_USER.to_string(),
            display_name: UNKNOWN_USER.to_string(),
            user_id: String::new(),
        });

    (author, item)
}

/// Download the configured media of a single pin.
pub async fn download_single_pin(
    api: &PinterestApi,
    muxer: &Muxer,
    config: &Config,
    cancel: &CancelContext,
    pin: Option<&str>,
    source: &MetadataSource,
) -> Result<DownloadState> {
    let root = config.output_directory();
    let media_type = config.options.media_type;

    let (author, item) = match source {
        MetadataSource::Cache(key) => cached_pin(&root, key)?,
        MetadataSource::Live => {
            let input = pin.ok_or_else(|| Error::InvalidPinRef(String::new()))?;
            let pin_ref = parse_pin_ref(input, &config.site.host)?;
            tracing::info!("Downloading pin {} ({:?} link)", pin_ref.id, pin_ref.format);

            let (author, item) = fetch_pin(api, &pin_ref).await?;
            if config.options.save_metadata {
                let document = MetadataDocument {
                    author: author.clone(),
                    items: vec![item.clone()],
                };
                save_pin_metadata(
                    &root,
                    &document,
                    &item.pin_id,
                    media_type,
                    config.options.overwrite,
                )?;
            }
            (author, item)
        }
    };

    print_pin_summary(&author, &item);

    let mut state = DownloadState::new(&author.username);
    match download_media_item(
        api, muxer, config, &mut state, cancel, &author, &item, media_type,
    )
    .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!("Pin {} has no {}", item.pin_id, media_type.folder_name());
            state.mark_failed(&item.pin_id);
        }
        Err(e) => {
            tracing::error!("Pin {} failed: {}", item.pin_id, e);
            state.mark_failed(&item.pin_id);
        }
    }

    Ok(state)
}

fn cached_pin(root: &std::path::Path, key: &CacheKey) -> Result<(AuthorIdentity, MediaItem)> {
    let document = find_cached(root, key)?.ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let item = match key {
        CacheKey::PinId(id) => document.items.iter().find(|i| &i.pin_id == id),
        CacheKey::Username(_) => None,
    }
    .or_else(|| document.items.first())
    .cloned()
    .ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    Ok((document.author, item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinRefFormat;
    use crate::media::MediaType;

    fn pin_ref(format: PinRefFormat, id: &str) -> PinRef {
        PinRef {
            format,
            id: id.into(),
            url: format!("https://id.pinterest.com/pin/{}/", id),
        }
    }

    fn item(pin_id: &str) -> MediaItem {
        MediaItem {
            title: "t".into(),
            pin_id: pin_id.into(),
            upload_date: None,
            image_url: Some("https://i.pinimg.com/originals/a.jpg".into()),
            video: None,
        }
    }

    #[test]
    fn test_finish_pin_fills_missing_id_and_author() {
        let (author, filled) = finish_pin(
            &pin_ref(PinRefFormat::Id, "1234567890123456"),
            None,
            item(""),
        );
        assert_eq!(filled.pin_id, "1234567890123456");
        assert_eq!(author.username, "unknown");

        let placeholder = AuthorIdentity {
            username: "-".into(),
            display_name: "-".into(),
            user_id: "-".into(),
        };
        let (author, _) = finish_pin(
            &pin_ref(PinRefFormat::Id, "1234567890123456"),
            Some(placeholder),
            item("9"),
        );
        assert_eq!(author.username, "unknown");
    }

    #[test]
    fn test_cached_pin_by_id() {
        let root = tempfile::tempdir().unwrap();
        let document = MetadataDocument {
            author: AuthorIdentity {
                username: "artist".into(),
                display_name: "The Artist".into(),
                user_id: "777".into(),
            },
            items: vec![item("1234567890123456")],
        };
        save_pin_metadata(root.path(), &document, "1234567890123456", MediaType::Image, false)
            .unwrap();

        let (author, found) =
            cached_pin(root.path(), &CacheKey::PinId("1234567890123456".into())).unwrap();
        assert_eq!(author.username, "artist");
        assert_eq!(found.pin_id, "1234567890123456");

        let err = cached_pin(root.path(), &CacheKey::PinId("42".into())).unwrap_err();
        assert!(matches!(err, Error::CacheMiss(_)));
    }
}
