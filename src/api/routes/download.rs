//! Download handler: run one task and stream its artifact back.

use crate::api::AppState;
use crate::error::{Error, Result};
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

/// Request body for POST /download
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBody {
    /// Source page URL (http or https)
    pub url: Option<String>,

    /// `"wav"` for audio-only; anything else (or omitted) for MP4 video
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Maximum video height, as a string (`"720"`, `"720p"`) or number; default 1080
    #[schema(value_type = Option<String>)]
    pub quality: Option<Value>,

    /// Client-chosen task id, so progress can be subscribed to before posting
    pub task_id: Option<String>,
}

impl DownloadBody {
    /// The quality field as text, whichever JSON type the client used
    fn quality_text(&self) -> Result<Option<String>> {
        match &self.quality {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(Error::Validation(format!(
                "quality must be a string or number, got {other}"
            ))),
        }
    }
}

/// POST /download - Download media and return it as an attachment
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "downloads",
    request_body = DownloadBody,
    responses(
        (status = 200, description = "The artifact, with a Content-Disposition attachment filename", content_type = "application/octet-stream"),
        (status = 400, description = "Missing or invalid request field", body = crate::error::ApiError),
        (status = 500, description = "Download failed", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    body: std::result::Result<Json<DownloadBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return Error::Validation(rejection.body_text()).into_response();
        }
    };

    match download(&state, body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn download(state: &AppState, body: DownloadBody) -> Result<Response> {
    let quality = body.quality_text()?;
    let request = state.orchestrator.prepare(
        body.url.as_deref(),
        body.kind.as_deref(),
        quality.as_deref(),
        body.task_id.as_deref(),
    )?;
    let task_id = request.task_id.clone();

    let delivery = state.orchestrator.run(request).await.inspect_err(|e| {
        tracing::warn!(task_id = %task_id, error = %e, "download request failed");
    })?;

    tracing::debug!(
        task_id = %task_id,
        file_name = %delivery.file_name(),
        bytes = delivery.content_length,
        "streaming artifact"
    );

    let headers = [
        (header::CONTENT_TYPE, delivery.kind.content_type().to_string()),
        (header::CONTENT_LENGTH, delivery.content_length.to_string()),
        (header::CONTENT_DISPOSITION, delivery.content_disposition()),
        (
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            "Content-Disposition".to_string(),
        ),
    ];
    let stream = delivery.into_stream().await?;

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}
