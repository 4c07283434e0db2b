use super::*;
use crate::test_helpers::{FakeDownloader, FetchBehavior, TitleBehavior};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use std::time::Duration;
use tower::ServiceExt;


/// Router wired to a fake downloader; keep the fake alive for the test
async fn create_test_app(fake: &FakeDownloader) -> (Router, Orchestrator) {
    let config = fake.config();
    let orchestrator = Orchestrator::new(config.clone()).await.unwrap();
    let app = create_router(orchestrator.clone(), Arc::new(config));
    (app, orchestrator)
}

fn default_fake() -> FakeDownloader {
    FakeDownloader::new(
        TitleBehavior::Print("Clip Title"),
        FetchBehavior::Succeed { payload: "media" },
    )
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Reads server-sent event frames off a response body
struct FrameReader {
    stream: axum::body::BodyDataStream,
    buffer: String,
}

impl FrameReader {
    fn new(response: axum::response::Response) -> Self {
        Self {
            stream: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Next frame (without the blank-line terminator), skipping keep-alives
    async fn next_frame(&mut self) -> String {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame = self.buffer[..end].to_string();
                self.buffer.drain(..end + 2);
                if frame.starts_with(':') {
                    continue;
                }
                return frame;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(10), self.stream.next())
                .await
                .expect("timed out waiting for an SSE frame")
                .expect("SSE stream ended")
                .unwrap();
            self.buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    /// Next frame's `data:` payload parsed as JSON, with its event name
    async fn next_event(&mut self) -> (Option<String>, serde_json::Value) {
        let frame = self.next_frame().await;
        let mut name = None;
        let mut data = String::new();
        for line in frame.lines() {
            if let Some(v) = line.strip_prefix("event:") {
                name = Some(v.trim().to_string());
            } else if let Some(v) = line.strip_prefix("data:") {
                data.push_str(v.trim_start());
            }
        }
        (name, serde_json::from_str(&data).unwrap())
    }
}

#[tokio::test]
async fn test_api_server_spawns_and_shuts_down() {
    let fake = default_fake();
    let mut config = fake.config();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);
    let orchestrator = Orchestrator::new((*config).clone()).await.unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(orchestrator, config, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let fake = default_fake();
    let (app, _orchestrator) = create_test_app(&fake).await;

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let fake = default_fake();
    let mut config = fake.config();
    config.server.api.cors_enabled = false;
    let orchestrator = Orchestrator::new(config.clone()).await.unwrap();
    let app = create_router(orchestrator, Arc::new(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_static_assets_served_from_configured_dir() {
    let fake = default_fake();
    let public = fake.dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<h1>media-dl</h1>").unwrap();

    let mut config = fake.config();
    config.server.api.static_dir = Some(public);
    let orchestrator = Orchestrator::new(config.clone()).await.unwrap();
    let app = create_router(orchestrator, Arc::new(config));

    let response = app.clone().oneshot(get("/index.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<h1>media-dl</h1>");

    let response = app.oneshot(get("/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_without_static_dir_is_404() {
    let fake = default_fake();
    let (app, _orchestrator) = create_test_app(&fake).await;

    let response = app.oneshot(get("/index.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
