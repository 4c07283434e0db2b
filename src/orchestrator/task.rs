//! One task, from accepted request to deliverable artifact

use futures::StreamExt;
use std::collections::VecDeque;

use super::Orchestrator;
use super::artifact::{ArtifactStream, TempArtifact, artifact_path};
use super::request::DownloadRequest;
use super::state::{Lifecycle, TaskState, check_completion};
use super::title::resolve_title;
use crate::error::{Error, Result};
use crate::progress::{ProgressTracker, parse_progress};
use crate::runner::{self, RunOptions, StreamOrigin};
use crate::types::{MediaKind, TaskId};
use crate::utils::content_disposition;

/// Non-progress stderr lines kept for the failure log
const DIAGNOSTIC_LINES: usize = 5;

/// A produced artifact ready to be streamed to the client
///
/// Owns the temp file: dropping an undelivered `Delivery` deletes it.
#[derive(Debug)]
pub struct Delivery {
    /// The task that produced the artifact
    pub task_id: TaskId,
    /// Sanitized title (or placeholder) used as the filename stem
    pub title: String,
    /// Audio or video
    pub kind: MediaKind,
    /// Artifact size in bytes
    pub content_length: u64,
    artifact: TempArtifact,
}

impl Delivery {
    /// `<title>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.title, self.kind.extension())
    }

    /// `Content-Disposition` header value for this artifact
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.title, self.kind.extension())
    }

    /// Where the artifact currently lives
    pub fn path(&self) -> &std::path::Path {
        self.artifact.path()
    }

    /// Open the artifact as a byte stream that deletes it when dropped
    pub async fn into_stream(self) -> Result<ArtifactStream> {
        Ok(ArtifactStream::open(self.artifact, self.task_id).await?)
    }
}

/// Drive one task to completion
///
/// Publishes a Failed event on every failure path before returning the error.
pub(super) async fn execute(orchestrator: Orchestrator, request: DownloadRequest) -> Result<Delivery> {
    let DownloadRequest {
        url,
        kind,
        quality,
        task_id,
    } = request;
    let config = orchestrator.config();

    let mut lifecycle = Lifecycle::new(task_id.clone());
    tracing::info!(task_id = %task_id, url = %url, ?kind, quality = quality.height(), "task created");

    let artifact = TempArtifact::new(artifact_path(config.temp_dir(), &task_id, kind));

    lifecycle.advance(TaskState::TitleResolving);
    let title = resolve_title(
        orchestrator.downloader(),
        &task_id,
        &url,
        config.download.title_timeout,
        &config.download.default_title,
    )
    .await;
    tracing::info!(task_id = %task_id, title = %title, "title resolved");

    lifecycle.advance(TaskState::Executing);
    let mut tracker = ProgressTracker::new(task_id.clone());
    orchestrator.bus().publish(tracker.started());

    let args = orchestrator
        .downloader()
        .fetch_args(&config.tools, kind, quality, artifact.path(), &url);
    let options = RunOptions::capturing(config.download.progress_streams);

    let mut handle = match runner::spawn(orchestrator.downloader().program(), args, options) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "downloader could not start");
            orchestrator.bus().publish(tracker.failed());
            lifecycle.advance(TaskState::Failed);
            return Err(e);
        }
    };

    tracing::debug!(task_id = %task_id, pid = handle.pid(), "downloader started");

    let lines = handle.take_lines();
    let mut diagnostics: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_LINES);
    let pump_progress = async {
        let Some(mut lines) = lines else { return };
        while let Some(line) = lines.next().await {
            match parse_progress(&line.line) {
                Some(parsed) => {
                    if let Some(event) = tracker.admit(parsed) {
                        orchestrator.bus().publish(event);
                    }
                }
                None if line.origin == StreamOrigin::Stderr => {
                    tracing::debug!(task_id = %task_id, line = %line.line, "downloader");
                    if diagnostics.len() == DIAGNOSTIC_LINES {
                        diagnostics.pop_front();
                    }
                    diagnostics.push_back(line.line);
                }
                None => {}
            }
        }
    };

    let (outcome, ()) = tokio::join!(handle.wait(), pump_progress);
    let exists = artifact.exists().await;

    if let Err(failure) = check_completion(&task_id, outcome, artifact.path(), exists) {
        tracing::warn!(
            task_id = %task_id,
            ?outcome,
            progress = tracker.last_percent(),
            phase = ?tracker.phase(),
            error = %failure,
            stderr_tail = ?diagnostics,
            "download failed"
        );
        orchestrator.bus().publish(tracker.failed());
        lifecycle.advance(TaskState::Failed);
        return Err(Error::Execution(failure));
    }

    let content_length = match tokio::fs::metadata(artifact.path()).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!(task_id = %task_id, error = %e, "artifact vanished before delivery");
            orchestrator.bus().publish(tracker.failed());
            lifecycle.advance(TaskState::Failed);
            return Err(Error::Io(e));
        }
    };

    orchestrator.bus().publish(tracker.complete());
    lifecycle.advance(TaskState::Completed);
    tracing::info!(
        task_id = %task_id,
        bytes = content_length,
        state = ?lifecycle.state(),
        "download complete"
    );

    Ok(Delivery {
        task_id,
        title,
        kind,
        content_length,
        artifact,
    })
}
