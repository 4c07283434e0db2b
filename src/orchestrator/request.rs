//! Validated download requests

use crate::error::{Error, Result};
use crate::types::{MediaKind, QualityCeiling, TaskId};

/// A download request that passed validation
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadRequest {
    /// Source page URL (http or https)
    pub url: String,
    /// Audio or video output
    pub kind: MediaKind,
    /// Height ceiling; ignored for audio
    pub quality: QualityCeiling,
    /// Client-supplied or generated task identifier
    pub task_id: TaskId,
}

impl DownloadRequest {
    /// Validate raw request fields
    ///
    /// - `url` must be present and an absolute http(s) URL
    /// - `kind` is `"wav"` for audio, anything else (or nothing) for video
    /// - `quality` defaults to `default_quality`
    /// - a blank or missing `task_id` gets a generated one
    pub fn from_parts(
        url: Option<&str>,
        kind: Option<&str>,
        quality: Option<&str>,
        task_id: Option<&str>,
        default_quality: u32,
    ) -> Result<Self> {
        let url = match url.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return Err(Error::Validation("url is required".into())),
        };
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Validation(format!("url is not valid: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Validation(format!(
                "url scheme must be http or https, got {:?}",
                parsed.scheme()
            )));
        }

        let kind = MediaKind::from_request_type(kind);
        let quality = QualityCeiling::parse(quality, default_quality)?;
        let task_id = match task_id.map(str::trim) {
            Some(id) if !id.is_empty() => TaskId::from(id),
            _ => TaskId::generate(),
        };

        Ok(Self {
            url: url.to_string(),
            kind,
            quality,
            task_id,
        })
    }
}
