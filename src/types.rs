//! Core types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Opaque identifier of one download task
///
/// Either supplied by the client (so it can open the progress stream before
/// posting the download) or generated by the server.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random task identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier reduced to characters that are safe inside a filename
    ///
    /// Anything outside `[A-Za-z0-9_-]` becomes `_`, so a client-supplied id
    /// can never escape the temp directory.
    pub fn file_component(&self) -> String {
        let safe: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if safe.is_empty() { "task".to_string() } else { safe }
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Requested output kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio-only extraction to WAV
    Audio,
    /// Video+audio merged into an MP4 container
    Video,
}

impl MediaKind {
    /// Map the request's `type` field: `"wav"` selects audio, anything else video
    pub fn from_request_type(kind: Option<&str>) -> Self {
        match kind {
            Some(k) if k.eq_ignore_ascii_case("wav") => MediaKind::Audio,
            _ => MediaKind::Video,
        }
    }

    /// File extension of the produced artifact
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "wav",
            MediaKind::Video => "mp4",
        }
    }

    /// MIME type used when serving the artifact
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/wav",
            MediaKind::Video => "video/mp4",
        }
    }
}

/// Maximum vertical resolution for video format selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct QualityCeiling(pub u32);

impl QualityCeiling {
    /// Parse the request's `quality` field
    ///
    /// Accepts a bare height (`"720"`) or the common `"720p"` spelling.
    /// `None` or an empty string falls back to `default`.
    pub fn parse(raw: Option<&str>, default: u32) -> Result<Self> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(Self(default)),
            Some(r) => r,
        };
        let digits = raw
            .strip_suffix('p')
            .or_else(|| raw.strip_suffix('P'))
            .unwrap_or(raw);
        match digits.parse::<u32>() {
            Ok(height) if height > 0 => Ok(Self(height)),
            _ => Err(Error::Validation(format!(
                "quality must be a positive height, got {raw:?}"
            ))),
        }
    }

    /// The height in pixels
    pub fn height(&self) -> u32 {
        self.0
    }
}

/// Externally reported phase of a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Phase {
    /// Fetching media streams
    Downloading,
    /// Combining streams into the output container
    Merging,
    /// Artifact produced and about to be served
    Complete,
    /// Task ended without an artifact
    Failed,
}

impl Phase {
    /// Whether no further events follow this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

/// One normalized progress update, as delivered to subscribers
///
/// Serialized as `{"taskId": ..., "progress": ..., "status": ...}` plus the
/// optional `speed` and `eta` strings when the downloader reported them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// The task this event belongs to
    pub task_id: TaskId,
    /// Percentage in the range 0-100
    pub progress: f64,
    /// Current phase
    pub status: Phase,
    /// Download speed as reported by the downloader (e.g. "1.23MiB/s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Remaining time as reported by the downloader (e.g. "00:05")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

impl ProgressEvent {
    /// Create an event without speed/eta details
    pub fn new(task_id: TaskId, progress: f64, status: Phase) -> Self {
        Self {
            task_id,
            progress,
            status,
            speed: None,
            eta: None,
        }
    }
}

/// Availability of one external tool
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolInfo {
    /// Executable name or configured path
    pub name: String,
    /// Resolved location, if found
    #[schema(value_type = Option<String>)]
    pub path: Option<PathBuf>,
    /// Whether the tool was found
    pub available: bool,
}

/// External tool availability reported by `GET /api/capabilities`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// The media downloader (yt-dlp)
    pub downloader: ToolInfo,
    /// The accelerated external downloader, if one is configured
    pub external_downloader: Option<ToolInfo>,
}
