//! Media file downloading.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use indicatif::ProgressBar;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::api::PinterestApi;
use crate::config::Config;
use crate::download::cancel::CancelContext;
use crate::download::hls::download_hls;
use crate::download::mux::Muxer;
use crate::download::state::DownloadState;
use crate::error::{AcquisitionError, Error, Result};
use crate::fs::{ensure_dir, filename_from_url, media_dir};
use crate::media::{AuthorIdentity, MediaItem, MediaType};
use crate::output::create_download_bar;

/// Minimum file size to show progress bar (2 MB).
const PROGRESS_THRESHOLD: u64 = 2 * 1024 * 1024;

/// What to do with a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Write,
    Rewrite,
    Skip,
}

/// Overwrite policy: absent files are written, existing ones are rewritten
/// only when `overwrite` is set and skipped otherwise.
pub fn overwrite_action(exists: bool, overwrite: bool) -> WriteAction {
    match (exists, overwrite) {
        (false, _) => WriteAction::Write,
        (true, true) => WriteAction::Rewrite,
        (true, false) => WriteAction::Skip,
    }
}

/// A single url-to-file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub source_url: String,
    pub destination: PathBuf,
    pub overwrite: bool,
}

/// Outcome of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    Written { path: PathBuf, bytes: u64 },
    /// The destination existed and overwrite was off.
    Skipped { path: PathBuf },
}

impl Acquired {
    pub fn path(&self) -> &Path {
        match self {
            Acquired::Written { path, .. } | Acquired::Skipped { path } => path,
        }
    }
}

/// Transfer `task.source_url` to `task.destination`.
///
/// The destination is registered with `cancel` while bytes are written and
/// removed again if the transfer fails part way.
pub async fn acquire(
    api: &PinterestApi,
    task: &DownloadTask,
    cancel: &CancelContext,
    show_progress: bool,
) -> Result<Acquired> {
    let action = overwrite_action(task.destination.exists(), task.overwrite);
    if action == WriteAction::Skip {
        tracing::debug!("Skipping existing file: {}", task.destination.display());
        return Ok(Acquired::Skipped {
            path: task.destination.clone(),
        });
    }
    if action == WriteAction::Rewrite {
        tracing::debug!("Overwriting {}", task.destination.display());
    }

    let response = api.download_file(&task.source_url).await?;
    let total = response.content_length();

    let progress = if show_progress && total.is_some_and(|l| l > PROGRESS_THRESHOLD) {
        Some(create_download_bar(total.unwrap_or(0)))
    } else {
        None
    };

    let result = write_stream(
        response.bytes_stream(),
        &task.source_url,
        &task.destination,
        cancel,
        progress.as_ref(),
    )
    .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let bytes = result?;
    Ok(Acquired::Written {
        path: task.destination.clone(),
        bytes,
    })
}

/// Stream `chunks` into `destination`, returning the byte count.
///
/// On any error the partial file is removed before returning.
pub async fn write_stream<S, B, E>(
    chunks: S,
    source_url: &str,
    destination: &Path,
    cancel: &CancelContext,
    progress: Option<&ProgressBar>,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut chunks = std::pin::pin!(chunks);
    let in_flight = cancel.register(destination);

    let result = async {
        let mut file = File::create(destination).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| AcquisitionError::TransferFailed {
                url: source_url.to_string(),
                reason: e.to_string(),
            })?;
            file.write_all(chunk.as_ref()).await?;
            written += chunk.as_ref().len() as u64;

            if let Some(pb) = progress {
                pb.set_position(written);
            }
        }

        file.flush().await?;
        Ok::<u64, Error>(written)
    }
    .await;

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(destination).await {
            tracing::debug!("Could not remove {}: {}", destination.display(), e);
        }
    }
    in_flight.finish();

    result
}

/// Download one media of `item` into the author's folder, updating stats.
///
/// Manifest-backed videos go through the muxer; everything else is fetched
/// directly. Returns `Ok(None)` when the item has no media of `media_type`.
#[allow(clippy::too_many_arguments)]
pub async fn download_media_item(
    api: &PinterestApi,
    muxer: &Muxer,
    config: &Config,
    state: &mut DownloadState,
    cancel: &CancelContext,
    author: &AuthorIdentity,
    item: &MediaItem,
    media_type: MediaType,
) -> Result<Option<Acquired>> {
    let Some(url) = item.url_for(media_type) else {
        tracing::debug!("Pin {} has no {:?}", item.pin_id, media_type);
        return Ok(None);
    };

    let assembled = item.needs_stream_assembly(media_type);
    let target_dir = media_dir(&config.output_directory(), &author.username, media_type)?;
    let filename = filename_from_url(url, &item.pin_id, assembled)?;
    let destination = target_dir.join(&filename);

    ensure_dir(&target_dir)?;

    let acquired = if assembled {
        download_hls(
            api,
            muxer,
            cancel,
            url,
            &destination,
            config.options.overwrite,
        )
        .await?
    } else {
        let task = DownloadTask {
            source_url: url.to_string(),
            destination,
            overwrite: config.options.overwrite,
        };
        acquire(api, &task, cancel, config.options.show_progress).await?
    };

    match &acquired {
        Acquired::Written { path, bytes } => {
            match media_type {
                MediaType::Image => state.increment_image(),
                MediaType::Video => state.increment_video(),
            }
            tracing::info!("Downloaded: {} ({} bytes)", path.display(), bytes);
        }
        Acquired::Skipped { path } => {
            state.increment_skipped();
            tracing::info!("Already exists: {}", path.display());
        }
    }

    Ok(Some(acquired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, SiteConfig};
    use futures::stream;

    fn api() -> PinterestApi {
        PinterestApi::new(&SiteConfig::default(), RetryConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_acquire_skips_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"old").unwrap();

        let task = DownloadTask {
            source_url: "http://127.0.0.1:9/a.jpg".into(),
            destination: path.clone(),
            overwrite: false,
        };
        let cancel = CancelContext::new();
        let acquired = acquire(&api(), &task, &cancel, false).await.unwrap();

        assert_eq!(acquired, Acquired::Skipped { path: path.clone() });
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        assert_eq!(cancel.current(), None);
    }

    #[test]
    fn test_overwrite_truth_table() {
        assert_eq!(overwrite_action(false, false), WriteAction::Write);
        assert_eq!(overwrite_action(false, true), WriteAction::Write);
        assert_eq!(overwrite_action(true, false), WriteAction::Skip);
        assert_eq!(overwrite_action(true, true), WriteAction::Rewrite);
    }

    #[tokio::test]
    async fn test_write_stream_writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jpg");
        let cancel = CancelContext::new();

        let chunks = stream::iter(vec![
            Ok::<_, std::io::Error>(b"abc".to_vec()),
            Ok(b"defg".to_vec()),
        ]);
        let written = write_stream(chunks, "https://i.pinimg.com/a.jpg", &dest, &cancel, None)
            .await
            .unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdefg");
        assert_eq!(cancel.current(), None);
    }

    #[tokio::test]
    async fn test_write_stream_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("b.jpg");
        let cancel = CancelContext::new();

        let chunks = stream::iter(vec![
            Ok(b"abc".to_vec()),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
        ]);
        let err = write_stream(chunks, "https://i.pinimg.com/b.jpg", &dest, &cancel, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Acquisition(AcquisitionError::TransferFailed { ref url, .. })
                if url == "https://i.pinimg.com/b.jpg"
        ));
        assert!(!dest.exists());
        assert_eq!(cancel.current(), None);
    }

    #[test]
    fn test_acquired_path() {
        let skipped = Acquired::Skipped {
            path: PathBuf::from("/out/a.jpg"),
        };
        assert_eq!(skipped.path(), Path::new("/out/a.jpg"));
    }
}
