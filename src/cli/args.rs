//! Command-line argument definitions using clap.

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{CacheKey, Config, DownloadMode, MetadataSource};
use crate::error::{Error, Result};
use crate::media::MediaType;

/// Pinterest media downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "pinterest-downloader",
    version,
    disable_version_flag = true,
    about = "Download images and videos from Pinterest creators and pins",
    long_about = "A CLI tool to download images and videos from Pinterest.\n\n\
                  Pages through a creator's pins or fetches a single pin by url or id. \
                  Adaptive (HLS) videos are muxed into MP4 with ffmpeg."
)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["username", "pin", "cache"])
))]
pub struct Args {
    /// Creator username to download from.
    #[arg(short, long)]
    pub username: Option<String>,

    /// Pin url, pin.it short link, or pin id.
    #[arg(short, long)]
    pub pin: Option<String>,

    /// Type of media to download [default: image].
    #[arg(short = 't', long = "type", value_enum)]
    pub media_type: Option<MediaTypeArg>,

    /// Use saved metadata instead of fetching: <username> or <pinId>.
    #[arg(short, long)]
    pub cache: Option<String>,

    /// Save metadata JSON next to the downloads.
    #[arg(short, long)]
    pub metadata: bool,

    /// Overwrite existing files.
    #[arg(short, long)]
    pub overwrite: bool,

    /// Maximum number of feed pages to fetch.
    #[arg(long)]
    pub pages: Option<u32>,

    /// Base directory for downloads.
    #[arg(short = 'd', long = "directory")]
    pub output_directory: Option<PathBuf>,

    /// Path to the ffmpeg binary.
    #[arg(long, env = "FFMPEG_PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Hide download progress bars.
    #[arg(long)]
    pub no_progress: bool,

    /// Path to configuration file.
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Verbose output to console.
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// CLI media type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaTypeArg {
    /// Original images (video pins fall back to their cover).
    Image,
    /// Videos, muxed from HLS when no single file exists.
    Video,
}

impl From<MediaTypeArg> for MediaType {
    fn from(arg: MediaTypeArg) -> Self {
        match arg {
            MediaTypeArg::Image => MediaType::Image,
            MediaTypeArg::Video => MediaType::Video,
        }
    }
}

impl Args {
    /// What to download and where its metadata comes from.
    ///
    /// A cache key naming a user selects a feed run unless a username was
    /// given explicitly; a numeric key selects a pin run.
    pub fn download_mode(&self) -> Result<(DownloadMode, MetadataSource)> {
        let cache = self
            .cache
            .as_deref()
            .map(|c| c.parse::<CacheKey>().map_err(Error::Config))
            .transpose()?;

        let source = match &cache {
            Some(key) => MetadataSource::Cache(key.clone()),
            None => MetadataSource::Live,
        };

        if let Some(username) = &self.username {
            return Ok((
                DownloadMode::User {
                    username: username.clone(),
                },
                source,
            ));
        }

        match (&cache, &self.pin) {
            (Some(CacheKey::Username(username)), _) => Ok((
                DownloadMode::User {
                    username: username.clone(),
                },
                source,
            )),
            (Some(CacheKey::PinId(id)), None) => Ok((DownloadMode::Pin { pin: id.clone() }, source)),
            (_, Some(pin)) => Ok((DownloadMode::Pin { pin: pin.clone() }, source)),
            (None, None) => Err(Error::Config(
                "One of --username, --pin or --cache is required".to_string(),
            )),
        }
    }

    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(media_type) = self.media_type {
            config.options.media_type = media_type.into();
        }

        if let Some(pages) = self.pages {
            config.options.pages = pages;
        }

        if let Some(dir) = &self.output_directory {
            config.options.output_directory = Some(dir.clone());
        }

        if let Some(ffmpeg) = &self.ffmpeg {
            config.muxer.ffmpeg_path = ffmpeg.clone();
        }

        // Boolean flags (only override if set to non-default)
        if self.metadata {
            config.options.save_metadata = true;
        }

        if self.overwrite {
            config.options.overwrite = true;
        }

        if self.no_progress {
            config.options.show_progress = false;
        }
    }
}
