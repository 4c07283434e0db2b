//! Spawning and supervising one external process.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use super::pump::pump_lines;
use super::{ExitOutcome, OutputLine, RunOptions, StreamOrigin};
use crate::error::{Error, Result};

/// Lazy stream of output lines; ends once every captured pipe is closed
/// or shortly after the process exits, whichever comes first
pub type LineStream = UnboundedReceiverStream<OutputLine>;

/// How long pipes may stay open after the process has exited
///
/// A background child that inherited the pipes can keep them open
/// indefinitely; its output is cut off after this.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Handle to a running (or finished) external process
///
/// Dropping the handle terminates a process that is still running.
pub struct ProcessHandle {
    program: PathBuf,
    pid: Option<u32>,
    lines: Option<LineStream>,
    cancel: CancellationToken,
    outcome: watch::Receiver<Option<ExitOutcome>>,
    timeout: Option<Duration>,
    timed_out: bool,
}

/// Start `program` with `args`
///
/// Fails with [`Error::Launch`] if the executable cannot be started.
/// Must be called from within a tokio runtime.
pub fn spawn<I, S>(program: impl AsRef<Path>, args: I, options: RunOptions) -> Result<ProcessHandle>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref().to_path_buf();

    let mut cmd = Command::new(&program);
    cmd.args(args)
        .envs(&options.env)
        .stdin(Stdio::null())
        .stdout(pipe_if(options.capture.stdout()))
        .stderr(pipe_if(options.capture.stderr()))
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| Error::Launch {
        program: program.clone(),
        source,
    })?;
    let pid = child.id();

    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(pump_lines(stdout, StreamOrigin::Stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(pump_lines(stderr, StreamOrigin::Stderr, line_tx.clone()));
    }
    drop(line_tx);

    let cancel = CancellationToken::new();
    let (outcome_tx, outcome_rx) = watch::channel(None);
    tokio::spawn(supervise(
        child,
        pumps,
        cancel.clone(),
        outcome_tx,
        program.clone(),
    ));

    tracing::debug!(program = %program.display(), pid, "spawned process");

    Ok(ProcessHandle {
        program,
        pid,
        lines: Some(UnboundedReceiverStream::new(line_rx)),
        cancel,
        outcome: outcome_rx,
        timeout: options.timeout,
        timed_out: false,
    })
}

fn pipe_if(captured: bool) -> Stdio {
    if captured { Stdio::piped() } else { Stdio::null() }
}

/// Wait for the child to exit or for cancellation, reap it, publish the outcome.
async fn supervise(
    mut child: Child,
    pumps: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    outcome_tx: watch::Sender<Option<ExitOutcome>>,
    program: PathBuf,
) {
    let outcome = tokio::select! {
        biased;
        status = child.wait() => match status {
            Ok(status) => match status.code() {
                Some(code) => ExitOutcome::Exited(code),
                None => ExitOutcome::Signaled,
            },
            Err(e) => {
                tracing::error!(program = %program.display(), error = %e, "error waiting for process");
                ExitOutcome::Signaled
            }
        },
        _ = cancel.cancelled() => {
            // kill() also reaps
            if let Err(e) = child.kill().await {
                tracing::warn!(program = %program.display(), error = %e, "failed to kill process");
            }
            // Grandchildren may still hold the pipes open
            for pump in &pumps {
                pump.abort();
            }
            ExitOutcome::Killed
        }
    };

    tracing::debug!(program = %program.display(), ?outcome, "process finished");
    outcome_tx.send_replace(Some(outcome));

    close_pumps(pumps, &program).await;
}

/// Let the pumps read what is left in the pipes, then stop them
async fn close_pumps(mut pumps: Vec<JoinHandle<()>>, program: &Path) {
    let drained = futures::future::join_all(pumps.iter_mut());
    if tokio::time::timeout(PIPE_DRAIN_GRACE, drained).await.is_err() {
        tracing::debug!(
            program = %program.display(),
            "output pipes still open after exit, closing line stream"
        );
        for pump in &pumps {
            pump.abort();
        }
    }
}

impl ProcessHandle {
    /// The executable this handle supervises
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process id, if the process had one when spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the output line stream
    ///
    /// The stream is not restartable: only the first call returns `Some`.
    pub fn take_lines(&mut self) -> Option<LineStream> {
        self.lines.take()
    }

    /// Wait for the process to end
    ///
    /// With a timeout configured, a process still running when it elapses is
    /// killed and reaped, and this (and every later call) resolves to
    /// [`ExitOutcome::TimedOut`].
    pub async fn wait(&mut self) -> ExitOutcome {
        if self.timed_out {
            self.reaped().await;
            return ExitOutcome::TimedOut;
        }

        let Some(limit) = self.timeout else {
            return self.reaped().await;
        };

        match tokio::time::timeout(limit, self.reaped()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    program = %self.program.display(),
                    timeout_ms = limit.as_millis() as u64,
                    "process timed out, killing"
                );
                self.timed_out = true;
                self.kill();
                self.reaped().await;
                ExitOutcome::TimedOut
            }
        }
    }

    /// Forcibly terminate the process
    ///
    /// Idempotent; a no-op once the process has exited.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    /// The outcome if the process has already been reaped
    pub fn try_outcome(&self) -> Option<ExitOutcome> {
        if self.timed_out {
            return Some(ExitOutcome::TimedOut);
        }
        *self.outcome.borrow()
    }

    async fn reaped(&self) -> ExitOutcome {
        let mut rx = self.outcome.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).unwrap_or(ExitOutcome::Killed),
            // The supervisor only goes away without reporting if the runtime is shutting down
            Err(_) => ExitOutcome::Killed,
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .field("timeout", &self.timeout)
            .field("timed_out", &self.timed_out)
            .finish()
    }
}
