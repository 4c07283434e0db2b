//! Supervision of external processes
//!
//! [`spawn`] starts one executable and returns a [`ProcessHandle`] exposing:
//! - a lazy, single-use stream of output lines tagged with their origin
//! - [`ProcessHandle::wait`], which enforces the per-call timeout by forced
//!   termination and reports [`ExitOutcome::TimedOut`] instead of an error
//! - [`ProcessHandle::kill`], idempotent and safe after natural exit
//!
//! Every path (natural exit, kill, timeout, handle dropped) ends with the OS
//! process reaped.

mod process;
mod pump;

pub use process::{ProcessHandle, spawn};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Which output pipe a line came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamOrigin {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// One line of process output, without its terminator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLine {
    /// The pipe the line was read from
    pub origin: StreamOrigin,
    /// Line text, decoded as UTF-8 (invalid sequences replaced)
    pub line: String,
}

/// Which output pipes to capture as line streams
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capture {
    /// Standard output only
    Stdout,
    /// Standard error only
    Stderr,
    /// Both pipes, interleaved in arrival order
    #[default]
    Both,
}

impl Capture {
    /// Whether standard output is captured
    pub fn stdout(&self) -> bool {
        matches!(self, Capture::Stdout | Capture::Both)
    }

    /// Whether standard error is captured
    pub fn stderr(&self) -> bool {
        matches!(self, Capture::Stderr | Capture::Both)
    }
}

/// Options for one invocation
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Variables added to (or overriding) the inherited environment
    pub env: HashMap<String, String>,
    /// Upper bound for [`ProcessHandle::wait`]; `None` waits forever
    pub timeout: Option<Duration>,
    /// Pipes exposed as line streams; uncaptured pipes are discarded
    pub capture: Capture,
}

impl RunOptions {
    /// Options capturing the given pipes with no timeout
    pub fn capturing(capture: Capture) -> Self {
        Self {
            capture,
            ..Default::default()
        }
    }

    /// Set the wait timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// How a supervised process ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own with this code
    Exited(i32),
    /// The process was ended by a signal it did not get from us
    Signaled,
    /// [`ProcessHandle::kill`] terminated the process
    Killed,
    /// The wait timeout elapsed and the process was terminated
    TimedOut,
}

impl ExitOutcome {
    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }
}
