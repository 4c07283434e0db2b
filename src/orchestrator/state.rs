//! Task lifecycle states and the completion rule

use std::path::Path;

use crate::error::ExecutionFailure;
use crate::runner::ExitOutcome;
use crate::types::TaskId;

/// Internal lifecycle of one task
///
/// `Created → TitleResolving → Executing → Completed | Failed`, with a direct
/// `Executing → Failed` when the downloader cannot be started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Request accepted, nothing spawned yet
    Created,
    /// Title lookup running (bounded by the title timeout)
    TitleResolving,
    /// Fetch running, progress being published
    Executing,
    /// Artifact present and handed over for delivery
    Completed,
    /// Ended without an artifact
    Failed,
}

impl TaskState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Whether `self → next` is a legal step
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Created, TitleResolving)
                | (TitleResolving, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }
}

/// Current state of a running task, with transition logging
#[derive(Debug)]
pub(crate) struct Lifecycle {
    task_id: TaskId,
    state: TaskState,
}

impl Lifecycle {
    pub(crate) fn new(task_id: TaskId) -> Self {
        tracing::debug!(task_id = %task_id, state = ?TaskState::Created, "task state");
        Self {
            task_id,
            state: TaskState::Created,
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`; an illegal step is logged and ignored
    pub(crate) fn advance(&mut self, next: TaskState) {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                task_id = %self.task_id,
                from = ?self.state,
                to = ?next,
                "illegal task state transition"
            );
            return;
        }
        tracing::debug!(task_id = %self.task_id, from = ?self.state, to = ?next, "task state");
        self.state = next;
    }
}

/// Decide whether a finished fetch produced a deliverable artifact
///
/// Success needs both a clean exit and the file on disk. A clean exit
/// without the file is a failure, as is any non-zero exit even if a file
/// was left behind.
pub fn check_completion(
    task_id: &TaskId,
    outcome: ExitOutcome,
    artifact: &Path,
    artifact_exists: bool,
) -> Result<(), ExecutionFailure> {
    match outcome {
        ExitOutcome::Exited(0) if artifact_exists => Ok(()),
        ExitOutcome::Exited(0) => Err(ExecutionFailure::MissingArtifact {
            task_id: task_id.clone(),
            path: artifact.to_path_buf(),
        }),
        ExitOutcome::Exited(code) => Err(ExecutionFailure::NonZeroExit {
            task_id: task_id.clone(),
            code,
        }),
        ExitOutcome::Signaled | ExitOutcome::Killed | ExitOutcome::TimedOut => {
            Err(ExecutionFailure::Terminated {
                task_id: task_id.clone(),
            })
        }
    }
}
