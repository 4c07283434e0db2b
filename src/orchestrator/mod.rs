//! Download task orchestration
//!
//! The [`Orchestrator`] owns the shared pieces (configuration, event bus,
//! downloader location) and runs each accepted request as an independent
//! task:
//!
//! 1. title lookup, bounded by `title_timeout`, falling back to a placeholder
//! 2. fetch, with every recognized progress line published on the bus
//! 3. completion check (clean exit and artifact on disk)
//!
//! Each task runs on its own tokio task, so a caller that goes away (for
//! instance an HTTP client disconnecting) does not kill the downloader; the
//! finished artifact is simply dropped, and so deleted.

mod artifact;
mod plan;
mod request;
mod state;
mod task;
mod title;

pub use artifact::{ArtifactStream, TempArtifact, artifact_path, sweep_stale};
pub use plan::{DOWNLOADER_NAME, Downloader, external_downloader_info, video_format_selector};
pub use request::DownloadRequest;
pub use state::{TaskState, check_completion};
pub use task::Delivery;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{EventBus, Subscription};
use crate::types::{Capabilities, Phase, ProgressEvent};

/// Entry point for running downloads (cloneable - all fields are Arc-wrapped)
#[derive(Clone, Debug)]
pub struct Orchestrator {
    config: Arc<Config>,
    bus: Arc<EventBus>,
    downloader: Arc<Downloader>,
}

impl Orchestrator {
    /// Create an orchestrator
    ///
    /// - Creates the temp directory
    /// - Removes artifacts left behind by a previous run
    /// - Locates the downloader and logs whether it was found
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.temp_dir())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create temp directory '{}': {}",
                        config.temp_dir().display(),
                        e
                    ),
                ))
            })?;

        match sweep_stale(config.temp_dir()).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(removed = n, "removed stale artifacts"),
            Err(e) => tracing::warn!(error = %e, "failed to sweep temp directory"),
        }

        let downloader = Downloader::resolve(&config.tools);
        let info = downloader.info();
        if info.available {
            tracing::info!(program = %info.name, "downloader found");
        } else {
            tracing::warn!(
                program = %info.name,
                "downloader not found; tasks will fail until it is installed"
            );
        }

        let bus = EventBus::new(config.download.event_capacity);

        Ok(Self {
            config: Arc::new(config),
            bus: Arc::new(bus),
            downloader: Arc::new(downloader),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The progress event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Register a progress subscriber
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Availability of the external tools
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            downloader: self.downloader.info(),
            external_downloader: external_downloader_info(&self.config.tools),
        }
    }

    /// Validate raw request fields against this orchestrator's defaults
    pub fn prepare(
        &self,
        url: Option<&str>,
        kind: Option<&str>,
        quality: Option<&str>,
        task_id: Option<&str>,
    ) -> Result<DownloadRequest> {
        DownloadRequest::from_parts(
            url,
            kind,
            quality,
            task_id,
            self.config.download.default_quality,
        )
    }

    /// Run a task to completion and hand over its artifact
    ///
    /// The task keeps running if the returned future is dropped. Every
    /// failure is preceded by a Failed event for the task.
    pub async fn run(&self, request: DownloadRequest) -> Result<Delivery> {
        let task_id = request.task_id.clone();
        let handle = tokio::spawn(task::execute(self.clone(), request));

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "task aborted");
                self.bus
                    .publish(ProgressEvent::new(task_id, 0.0, Phase::Failed));
                Err(Error::TaskAborted(e.to_string()))
            }
        }
    }
}
