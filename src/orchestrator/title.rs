//! Title lookup: the bounded first phase of every task

use futures::StreamExt;
use std::time::Duration;

use super::plan::Downloader;
use crate::error::Error;
use crate::runner::{self, Capture, ExitOutcome, RunOptions};
use crate::types::TaskId;
use crate::utils::sanitize_title;

/// Ask the downloader for the media title
///
/// Never fails: a lookup that times out, cannot start, or prints nothing
/// usable yields `placeholder`. The first non-empty stdout line is used
/// even if the downloader exits non-zero.
pub(crate) async fn resolve_title(
    downloader: &Downloader,
    task_id: &TaskId,
    url: &str,
    timeout: Duration,
    placeholder: &str,
) -> String {
    let options = RunOptions::capturing(Capture::Stdout)
        .with_timeout(timeout)
        .with_env("PYTHONIOENCODING", "utf-8");

    let mut handle = match runner::spawn(downloader.program(), downloader.title_args(url), options)
    {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(task_id = %task_id, error = %e, "title lookup could not start, using placeholder");
            return placeholder.to_string();
        }
    };

    let lines = handle.take_lines();
    let first_line = async move {
        let mut first = None;
        if let Some(mut lines) = lines {
            while let Some(line) = lines.next().await {
                if first.is_none() && !line.line.trim().is_empty() {
                    first = Some(line.line);
                }
            }
        }
        first
    };

    // wait() is bounded on its own; reading the output must be too
    let lookup = async { tokio::join!(handle.wait(), first_line) };
    let (outcome, first) = match tokio::time::timeout(timeout, lookup).await {
        Ok(finished) => finished,
        Err(_) => (ExitOutcome::TimedOut, None),
    };

    match outcome {
        ExitOutcome::TimedOut => {
            handle.kill();
            let e = Error::ResolutionTimeout { after: timeout };
            tracing::warn!(task_id = %task_id, error = %e, "using placeholder title");
            return placeholder.to_string();
        }
        ExitOutcome::Exited(0) => {}
        other => {
            tracing::debug!(task_id = %task_id, outcome = ?other, "title lookup did not exit cleanly");
        }
    }

    match first.as_deref().and_then(sanitize_title) {
        Some(title) => title,
        None => placeholder.to_string(),
    }
}
