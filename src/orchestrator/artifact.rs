//! Temporary artifact lifetime
//!
//! Each task writes into `<temp_dir>/<unix-millis>_<task-id>.<ext>`. The
//! [`TempArtifact`] guard owns that path from the moment it is chosen and
//! deletes it, plus any intermediate files the downloader left next to it,
//! when dropped. Whether the task failed, the response was never sent, or
//! the client hung up mid-stream, the file goes away.

use bytes::Bytes;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

use crate::error::Error;
use crate::types::{MediaKind, TaskId};

/// Unique artifact location for a task
pub fn artifact_path(temp_dir: &Path, task_id: &TaskId, kind: MediaKind) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    temp_dir.join(format!(
        "{}_{}.{}",
        millis,
        task_id.file_component(),
        kind.extension()
    ))
}

/// Owns a temp artifact path and removes it on drop
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of `path` (the file need not exist yet)
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The artifact location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the downloader has produced the file
    pub async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Remove the artifact and its siblings
    ///
    /// Siblings are files whose name starts with the artifact's stem plus a
    /// dot, such as `.part` files or per-format streams awaiting merge.
    /// Missing files are ignored; other failures are logged.
    fn remove_all(&self) {
        remove_file_logged(&self.path);

        let (Some(dir), Some(stem)) = (self.path.parent(), self.path.file_stem()) else {
            return;
        };
        let prefix = format!("{}.", stem.to_string_lossy());

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to scan temp dir");
                }
                return;
            }
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                remove_file_logged(&entry.path());
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.remove_all();
    }
}

fn remove_file_logged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}

/// Artifact bytes as a body stream; the artifact is deleted when the stream is
/// dropped, after a complete read or not
pub struct ArtifactStream {
    inner: ReaderStream<tokio::fs::File>,
    artifact: TempArtifact,
    task_id: TaskId,
    finished: bool,
}

impl ArtifactStream {
    /// Open the artifact for streaming
    ///
    /// On failure the artifact is dropped, and so deleted.
    pub async fn open(artifact: TempArtifact, task_id: TaskId) -> io::Result<Self> {
        let file = tokio::fs::File::open(artifact.path()).await?;
        Ok(Self {
            inner: ReaderStream::new(file),
            artifact,
            task_id,
            finished: false,
        })
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            this.finished = true;
        }
        polled
    }
}

impl Drop for ArtifactStream {
    fn drop(&mut self) {
        if self.finished {
            tracing::info!(task_id = %self.task_id, "artifact delivered");
        } else {
            let e = Error::DeliveryInterrupted {
                task_id: self.task_id.clone(),
            };
            tracing::warn!(path = %self.artifact.path().display(), error = %e, "discarding artifact");
        }
    }
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("artifact", &self.artifact)
            .field("task_id", &self.task_id)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Whether `name` looks like an artifact this service wrote
fn is_artifact_name(name: &str) -> bool {
    match name.split_once('_') {
        Some((millis, rest)) => {
            !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()) && !rest.is_empty()
        }
        None => false,
    }
}

/// Delete artifacts left over from a previous run
///
/// Only files named like artifacts are touched. Returns how many were removed.
pub async fn sweep_stale(temp_dir: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(temp_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file || !is_artifact_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to remove stale artifact");
            }
        }
    }
    Ok(removed)
}
