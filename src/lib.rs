//! # media-dl
//!
//! Backend for a small web front-end that downloads media from video sites
//! through [yt-dlp](https://github.com/yt-dlp/yt-dlp).
//!
//! ## How it works
//!
//! - `POST /api/download` resolves the title, runs yt-dlp into a temporary
//!   file, and streams the result back as an attachment. The temporary file
//!   is removed once the response is done (or abandoned).
//! - `GET /api/progress?taskId=` streams that task's progress as server-sent
//!   events while the download runs.
//! - Each task runs in its own process; tasks share nothing but the event bus.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::new(Config::default()).await?;
//!
//!     // Subscribe before starting so no event is missed
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = orchestrator.prepare(
//!         Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
//!         Some("wav"),
//!         None,
//!         None,
//!     )?;
//!     let delivery = orchestrator.run(request).await?;
//!     println!("ready: {}", delivery.file_name());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API server (download, progress stream, system endpoints)
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Progress event bus
pub mod events;
/// Task orchestration (title lookup, fetch, artifact hand-off)
pub mod orchestrator;
/// Downloader output parsing
pub mod progress;
/// Child process supervision
pub mod runner;
/// Core types
pub mod types;
/// Filename and header helpers
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, ToolsConfig};
pub use error::{ApiError, Error, ErrorDetail, ExecutionFailure, Result, ToHttpStatus};
pub use events::{EventBus, Received, Subscription};
pub use orchestrator::{Delivery, DownloadRequest, Orchestrator};
pub use types::{Capabilities, MediaKind, Phase, ProgressEvent, QualityCeiling, TaskId, ToolInfo};

/// Run the API server until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Downloads still streaming when the signal arrives are allowed to finish.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_with_shutdown(Config::default()).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(config: Config) -> Result<()> {
    let orchestrator = Orchestrator::new(config.clone()).await?;
    api::start_api_server(orchestrator, std::sync::Arc::new(config), wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
