//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time by utoipa and served at
//! `/api/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Download media through yt-dlp and follow each task's progress over server-sent events",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::start_download,

        // Progress
        crate::api::routes::progress_stream,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_capabilities,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::Phase,
        crate::types::ProgressEvent,
        crate::types::Capabilities,
        crate::types::ToolInfo,

        // API request types
        crate::api::routes::DownloadBody,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Run a download task and receive the file as an attachment"),
        (name = "progress", description = "Per-task progress as server-sent events"),
        (name = "system", description = "System endpoints - Health checks, tool capabilities, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
