//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - The task failure taxonomy (validation, launch, execution, delivery)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::TaskId;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant carries enough context to diagnose which phase of a task
/// failed and why.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed client input. No task is created.
    #[error("validation error: {0}")]
    Validation(String),

    /// Title lookup exceeded its time budget
    ///
    /// Recovered inside the title phase; it never reaches a client.
    #[error("title lookup timed out after {}ms", .after.as_millis())]
    ResolutionTimeout {
        /// The budget that was exceeded
        after: Duration,
    },

    /// The external executable could not be started
    #[error("failed to launch {}: {source}", .program.display())]
    Launch {
        /// The executable that failed to start
        program: PathBuf,
        /// The underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The downloader ran but did not produce a usable artifact
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionFailure),

    /// The client went away while the artifact was being streamed
    #[error("delivery interrupted for task {task_id}")]
    DeliveryInterrupted {
        /// The task whose artifact was being delivered
        task_id: TaskId,
    },

    /// The background task driving a download panicked or was cancelled
    #[error("task aborted: {0}")]
    TaskAborted(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "title_timeout")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Task-fatal outcomes of the fetch phase
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    /// The downloader exited with a failure status
    #[error("downloader for task {task_id} exited with code {code}")]
    NonZeroExit {
        /// The task that failed
        task_id: TaskId,
        /// The exit code reported by the process
        code: i32,
    },

    /// The downloader was terminated by a signal or forced kill
    #[error("downloader for task {task_id} was terminated")]
    Terminated {
        /// The task that failed
        task_id: TaskId,
    },

    /// The downloader reported success but the artifact is missing
    #[error("downloader for task {task_id} produced no artifact")]
    MissingArtifact {
        /// The task that failed
        task_id: TaskId,
        /// Where the artifact was expected
        path: PathBuf,
    },
}

impl ExecutionFailure {
    /// The task this failure belongs to
    pub fn task_id(&self) -> &TaskId {
        match self {
            ExecutionFailure::NonZeroExit { task_id, .. }
            | ExecutionFailure::Terminated { task_id }
            | ExecutionFailure::MissingArtifact { task_id, .. } => task_id,
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "validation error: url is required"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error", "execution_failed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Validation(_) => 400,

            // Never surfaced: the client is already gone
            Error::DeliveryInterrupted { .. } => 500,

            // Recovered in the title phase
            Error::ResolutionTimeout { .. } => 504,

            // 500 Internal Server Error - Server-side issues
            Error::Launch { .. } => 500,
            Error::Execution(_) => 500,
            Error::TaskAborted(_) => 500,
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::ResolutionTimeout { .. } => "resolution_timeout",
            Error::Launch { .. } => "launch_error",
            Error::Execution(e) => match e {
                ExecutionFailure::NonZeroExit { .. } => "non_zero_exit",
                ExecutionFailure::Terminated { .. } => "terminated",
                ExecutionFailure::MissingArtifact { .. } => "missing_artifact",
            },
            Error::DeliveryInterrupted { .. } => "delivery_interrupted",
            Error::TaskAborted(_) => "task_aborted",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Execution(failure) => match failure {
                ExecutionFailure::NonZeroExit { task_id, code } => Some(serde_json::json!({
                    "task_id": task_id,
                    "exit_code": code,
                })),
                ExecutionFailure::Terminated { task_id } => Some(serde_json::json!({
                    "task_id": task_id,
                })),
                // The artifact path is server-internal and stays out of the body
                ExecutionFailure::MissingArtifact { task_id, .. } => Some(serde_json::json!({
                    "task_id": task_id,
                })),
            },
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
