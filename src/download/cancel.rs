//! Partial-file tracking for interrupt cleanup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Attempts made to delete a partial file before giving up.
const CLEANUP_ATTEMPTS: u32 = 5;

/// Pause between cleanup attempts.
const CLEANUP_BACKOFF: Duration = Duration::from_secs(1);

/// Tracks the one file currently being written.
///
/// Downloads run one at a time, so the slot holds at most one path. Clones
/// share the same slot, letting the interrupt handler see what the download
/// flow registered.
#[derive(Debug, Clone, Default)]
pub struct CancelContext {
    in_flight: Arc<Mutex<Option<PathBuf>>>,
}

/// Registration of an in-progress write. Call [`InFlight::finish`] once the
/// file is complete or has been removed.
///
/// Dropping the guard without finishing leaves the path registered, so an
/// interrupted write stays visible to [`CancelContext::cleanup`].
#[must_use = "finish the registration once the write is settled"]
#[derive(Debug)]
pub struct InFlight {
    context: CancelContext,
    path: PathBuf,
}

impl CancelContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as the file being written.
    pub fn register(&self, path: &Path) -> InFlight {
        let mut slot = self.lock();
        if let Some(previous) = slot.replace(path.to_path_buf()) {
            tracing::debug!("Replacing in-flight path {}", previous.display());
        }
        InFlight {
            context: self.clone(),
            path: path.to_path_buf(),
        }
    }

    /// Path currently being written, if any.
    pub fn current(&self) -> Option<PathBuf> {
        self.lock().clone()
    }

    /// Delete the in-flight file, retrying while it is busy.
    ///
    /// Failures are logged, never returned.
    pub async fn cleanup(&self) {
        let Some(path) = self.lock().take() else {
            return;
        };

        for attempt in 1..=CLEANUP_ATTEMPTS {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::info!("Removed partial file {}", path.display());
                    return;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => return,
                Err(e) if is_busy(&e) && attempt < CLEANUP_ATTEMPTS => {
                    tracing::warn!(
                        "Partial file {} is busy ({}), retrying ({}/{})",
                        path.display(),
                        e,
                        attempt,
                        CLEANUP_ATTEMPTS
                    );
                    tokio::time::sleep(CLEANUP_BACKOFF).await;
                }
                Err(e) => {
                    tracing::error!("Could not remove partial file {}: {}", path.display(), e);
                    return;
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PathBuf>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InFlight {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clear the registration if it still refers to this write.
    pub fn finish(self) {
        let mut slot = self.context.lock();
        if slot.as_deref() == Some(self.path.as_path()) {
            *slot = None;
        }
    }
}

/// `EBUSY` on unix, `ERROR_SHARING_VIOLATION` on windows.
const BUSY_OS_ERROR: i32 = if cfg!(windows) { 32 } else { 16 };

fn is_busy(error: &std::io::Error) -> bool {
    error.raw_os_error() == Some(BUSY_OS_ERROR)
}
