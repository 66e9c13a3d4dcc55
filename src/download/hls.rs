//! HLS manifest parsing, variant selection, and assembly into MP4.

use std::collections::HashMap;
use std::path::Path;

use m3u8_rs::{
    AlternativeMedia, AlternativeMediaType, MasterPlaylist, QuotedOrUnquoted, VariantStream,
};
use url::Url;

use crate::api::PinterestApi;
use crate::download::cancel::CancelContext;
use crate::download::media::{overwrite_action, Acquired, WriteAction};
use crate::download::mux::Muxer;
use crate::error::{ManifestError, Result};

/// Kind of an independently addressable rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenditionKind {
    Audio,
    Video,
    Other,
}

/// An `#EXT-X-MEDIA` rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub kind: RenditionKind,
    pub group_id: String,
    pub name: String,
    pub uri: Option<String>,
}

/// How a variant refers to its audio.
///
/// Playlists name a group, while manifests assembled elsewhere may already
/// carry the rendition itself or a list of candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioLink {
    Group(String),
    Rendition(Rendition),
    Renditions(Vec<Rendition>),
}

/// One video encoding option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub uri: String,
    pub bandwidth: u64,
    /// `(width, height)`.
    pub resolution: Option<(u64, u64)>,
    pub audio: Option<AudioLink>,
    /// Remaining `#EXT-X-STREAM-INF` attributes, unquoted.
    pub attributes: HashMap<String, String>,
}

impl Variant {
    fn area(&self) -> u64 {
        self.resolution.map(|(w, h)| w.saturating_mul(h)).unwrap_or(0)
    }

    /// Audio group this variant plays with.
    pub fn audio_group_id(&self) -> Option<String> {
        let linked = match &self.audio {
            Some(AudioLink::Group(group)) => Some(group.clone()),
            Some(AudioLink::Rendition(rendition)) => Some(rendition.group_id.clone()),
            Some(AudioLink::Renditions(renditions)) => {
                renditions.first().map(|r| r.group_id.clone())
            }
            None => None,
        };

        linked
            .filter(|group| !group.is_empty())
            .or_else(|| self.attributes.get("AUDIO").cloned())
    }

    /// Audio uri carried by the variant itself.
    fn embedded_audio_uri(&self) -> Option<&str> {
        match &self.audio {
            Some(AudioLink::Rendition(rendition)) => rendition.uri.as_deref(),
            Some(AudioLink::Renditions(renditions)) => {
                renditions.first().and_then(|r| r.uri.as_deref())
            }
            _ => None,
        }
    }
}

/// The parts of a master playlist used for selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub variants: Vec<Variant>,
    pub renditions: Vec<Rendition>,
}

impl Manifest {
    pub fn from_master(master: &MasterPlaylist) -> Self {
        Self {
            variants: master
                .variants
                .iter()
                .filter(|v| !v.is_i_frame)
                .map(variant_from_stream)
                .collect(),
            renditions: master.alternatives.iter().map(rendition_from_media).collect(),
        }
    }
}

fn variant_from_stream(stream: &VariantStream) -> Variant {
    let attributes = stream
        .other_attributes
        .as_ref()
        .map(|attrs| {
            attrs
                .iter()
                .map(|(k, v)| (k.clone(), unquote(v)))
                .collect()
        })
        .unwrap_or_default();

    Variant {
        uri: stream.uri.clone(),
        bandwidth: stream.bandwidth,
        resolution: stream.resolution.as_ref().map(|r| (r.width, r.height)),
        audio: stream.audio.clone().map(AudioLink::Group),
        attributes,
    }
}

fn rendition_from_media(media: &AlternativeMedia) -> Rendition {
    let kind = match media.media_type {
        AlternativeMediaType::Audio => RenditionKind::Audio,
        AlternativeMediaType::Video => RenditionKind::Video,
        _ => RenditionKind::Other,
    };

    Rendition {
        kind,
        group_id: media.group_id.clone(),
        name: media.name.clone(),
        uri: media.uri.clone(),
    }
}

fn unquote(value: &QuotedOrUnquoted) -> String {
    match value {
        QuotedOrUnquoted::Quoted(s) | QuotedOrUnquoted::Unquoted(s) => s.clone(),
    }
}

/// A parsed playlist.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPlaylist {
    Master(Manifest),
    /// Already a single rendition; nothing to select.
    Media,
}

pub fn parse_playlist(content: &str) -> std::result::Result<ParsedPlaylist, ManifestError> {
    match m3u8_rs::parse_playlist_res(content.as_bytes()) {
        Ok(m3u8_rs::Playlist::MasterPlaylist(master)) => {
            Ok(ParsedPlaylist::Master(Manifest::from_master(&master)))
        }
        Ok(m3u8_rs::Playlist::MediaPlaylist(_)) => Ok(ParsedPlaylist::Media),
        Err(e) => Err(ManifestError::Parse(format!("{:?}", e))),
    }
}

/// The chosen variant with its absolute url.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedVariant {
    pub variant: Variant,
    pub video_url: String,
    pub audio_group_id: Option<String>,
}

/// Pick the variant with the largest picture, then the highest bandwidth.
pub fn select_variant(
    manifest: &Manifest,
    base: &Url,
) -> std::result::Result<SelectedVariant, ManifestError> {
    let mut ranked: Vec<&Variant> = manifest.variants.iter().collect();
    ranked.sort_by(|a, b| {
        b.area()
            .cmp(&a.area())
            .then_with(|| b.bandwidth.cmp(&a.bandwidth))
    });

    let variant = ranked.first().ok_or(ManifestError::NoVariants)?;
    let video_url = resolve(base, &variant.uri)?;

    tracing::debug!(
        "Best variant {:?} @ {}bps: {}",
        variant.resolution,
        variant.bandwidth,
        video_url
    );

    Ok(SelectedVariant {
        variant: (*variant).clone(),
        video_url,
        audio_group_id: variant.audio_group_id(),
    })
}

/// Pick the audio rendition to mux with `variant`.
///
/// Returns `None` when the manifest has no addressable audio at all.
pub fn select_audio(
    manifest: &Manifest,
    base: &Url,
    audio_group_id: Option<&str>,
    variant: &Variant,
) -> std::result::Result<Option<String>, ManifestError> {
    if let Some(uri) = variant.embedded_audio_uri() {
        return resolve(base, uri).map(Some);
    }

    let audios: Vec<&Rendition> = manifest
        .renditions
        .iter()
        .filter(|r| r.kind == RenditionKind::Audio && r.uri.is_some())
        .collect();

    let pick = audio_group_id
        .and_then(|group| audios.iter().find(|r| r.group_id == group))
        .or_else(|| audios.first());

    match pick.and_then(|r| r.uri.as_deref()) {
        Some(uri) => resolve(base, uri).map(Some),
        None => {
            tracing::debug!("{}", ManifestError::NoAudioFound);
            Ok(None)
        }
    }
}

fn resolve(base: &Url, uri: &str) -> std::result::Result<String, ManifestError> {
    base.join(uri)
        .map(String::from)
        .map_err(|e| ManifestError::Parse(format!("invalid uri '{}': {}", uri, e)))
}

/// Fetch a playlist and pick the video and audio streams to mux.
pub async fn resolve_streams(
    api: &PinterestApi,
    manifest_url: &str,
) -> Result<(String, Option<String>)> {
    let base = Url::parse(manifest_url)?;
    let content = api.get_text(manifest_url).await?;

    match parse_playlist(&content)? {
        ParsedPlaylist::Media => Ok((manifest_url.to_string(), None)),
        ParsedPlaylist::Master(manifest) => {
            let selected = select_variant(&manifest, &base)?;
            let audio = select_audio(
                &manifest,
                &base,
                selected.audio_group_id.as_deref(),
                &selected.variant,
            )?;
            Ok((selected.video_url, audio))
        }
    }
}

/// Assemble the stream at `manifest_url` into `destination`.
///
/// ffmpeg writes to a temporary sibling that is renamed into place on success,
/// so `destination` never holds a partial file.
pub async fn download_hls(
    api: &PinterestApi,
    muxer: &Muxer,
    cancel: &CancelContext,
    manifest_url: &str,
    destination: &Path,
    overwrite: bool,
) -> Result<Acquired> {
    let action = overwrite_action(destination.exists(), overwrite);
    if action == WriteAction::Skip {
        tracing::debug!("Skipping existing file: {}", destination.display());
        return Ok(Acquired::Skipped {
            path: destination.to_path_buf(),
        });
    }

    let (video, audio) = resolve_streams(api, manifest_url).await?;
    tracing::info!(
        "Muxing {} (audio: {})",
        destination.display(),
        audio.as_deref().unwrap_or("embedded")
    );

    let temp = destination.with_extension(format!("{}.part.mp4", uuid::Uuid::new_v4()));
    let in_flight = cancel.register(&temp);

    let result: Result<()> = match muxer.mux(&video, audio.as_deref(), &temp).await {
        Ok(()) => tokio::fs::rename(&temp, destination).await.map_err(Into::into),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&temp).await {
            tracing::debug!("Could not remove {}: {}", temp.display(), e);
        }
    }
    in_flight.finish();
    result?;

    let bytes = tokio::fs::metadata(destination).await?.len();
    Ok(Acquired::Written {
        path: destination.to_path_buf(),
        bytes,
    })
}
