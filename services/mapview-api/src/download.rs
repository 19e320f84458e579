//! Background fetch of optional companion assets.
//!
//! Runs outside the render lock: downloads are cancelable and report
//! progress through a watch channel, so a slow mirror never blocks map
//! serving.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{info, warn};

/// Progress of one background download.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadProgress {
    Pending,
    Fetching {
        received: u64,
        total: Option<u64>,
    },
    Done(PathBuf),
    Failed(String),
    Cancelled,
}

/// Handle to a running background download.
pub struct DownloadHandle {
    progress: watch::Receiver<DownloadProgress>,
    cancel: Arc<AtomicBool>,
}

impl DownloadHandle {
    /// Latest progress snapshot.
    pub fn progress(&self) -> DownloadProgress {
        self.progress.borrow().clone()
    }

    /// Request cancellation; takes effect at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait until the download reaches a terminal state.
    pub async fn wait(&mut self) -> DownloadProgress {
        loop {
            let current = self.progress.borrow().clone();
            match current {
                DownloadProgress::Pending | DownloadProgress::Fetching { .. } => {
                    if self.progress.changed().await.is_err() {
                        return self.progress.borrow().clone();
                    }
                }
                terminal => return terminal,
            }
        }
    }
}

/// Start fetching `url` into `dest` on a background task.
pub fn spawn_fetch(url: String, dest: PathBuf) -> DownloadHandle {
    let (tx, rx) = watch::channel(DownloadProgress::Pending);
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();

    tokio::spawn(async move {
        let outcome = fetch(&url, &dest, &tx, &cancel_flag).await;
        let final_state = match outcome {
            Ok(true) => {
                info!(url = %url, dest = %dest.display(), "companion download complete");
                DownloadProgress::Done(dest)
            }
            Ok(false) => {
                info!(url = %url, "companion download cancelled");
                DownloadProgress::Cancelled
            }
            Err(e) => {
                warn!(url = %url, error = %e, "companion download failed");
                DownloadProgress::Failed(e.to_string())
            }
        };
        let _ = tx.send(final_state);
    });

    DownloadHandle {
        progress: rx,
        cancel,
    }
}

/// Returns Ok(true) on completion, Ok(false) on cancellation.
async fn fetch(
    url: &str,
    dest: &PathBuf,
    progress: &watch::Sender<DownloadProgress>,
    cancel: &AtomicBool,
) -> anyhow::Result<bool> {
    let mut response = reqwest::get(url).await?.error_for_status()?;
    let total = response.content_length();

    let mut file = tokio::fs::File::create(dest).await?;
    let mut received: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        if cancel.load(Ordering::SeqCst) {
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            return Ok(false);
        }
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        let _ = progress.send(DownloadProgress::Fetching { received, total });
    }

    file.flush().await?;
    Ok(true)
}
