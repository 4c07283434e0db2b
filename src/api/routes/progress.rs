//! Progress subscription gateway: one task's events as server-sent events.

use crate::api::AppState;
use crate::error::Error;
use crate::events::Received;
use crate::types::TaskId;
use axum::{
    extract::{Query, State},
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;

/// Query parameters for GET /progress
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    /// The task whose events to stream
    pub task_id: Option<String>,
}

/// GET /progress - Stream progress events for one task
///
/// Each event is a bare `data:` frame holding a JSON
/// [`ProgressEvent`](crate::types::ProgressEvent). A subscriber that falls
/// too far behind receives an `error` event reporting how many events it
/// missed. The stream stays open until the client disconnects.
#[utoipa::path(
    get,
    path = "/api/progress",
    tag = "progress",
    params(ProgressQuery),
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream", body = crate::types::ProgressEvent),
        (status = 400, description = "taskId missing", body = crate::error::ApiError)
    )
)]
pub async fn progress_stream(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let task_id = match query.task_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => TaskId::from(id),
        _ => return Error::Validation("taskId is required".into()).into_response(),
    };

    let subscription = state.orchestrator.subscribe();
    tracing::debug!(
        task_id = %task_id,
        subscription_id = subscription.id(),
        "progress stream opened"
    );

    let sse_stream = subscription
        .for_task(task_id)
        .filter_map(|received| match received {
            Received::Event(event) => match serde_json::to_string(&event) {
                Ok(json_data) => Some(Ok::<_, Infallible>(SseEvent::default().data(json_data))),
                Err(e) => {
                    tracing::warn!("Failed to serialize event to JSON: {}", e);
                    None
                }
            },
            Received::Lagged(skipped) => Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            )))),
        });

    Sse::new(sse_stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
