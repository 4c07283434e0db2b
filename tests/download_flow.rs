//! End-to-end flow through the public API with a scripted downloader.
#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use media_dl::{Config, Orchestrator, Phase, Received};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Answers `--get-title` with a fixed title; otherwise reports progress and
/// writes a small file to the `-o` path
const FAKE_YTDLP: &str = r#"
case " $* " in
  *' --get-title '*) echo 'Integration: Clip?'; exit 0 ;;
esac
out=''
prev=''
for a in "$@"; do
  if [ "$prev" = '-o' ]; then out="$a"; fi
  prev="$a"
done
echo '[download]  50.0% of 4.00KiB at 2.00KiB/s ETA 00:01'
echo '[download] 100.0% of 4.00KiB'
printf 'payload' > "$out"
"#;

fn config_for(dir: &Path) -> Config {
    let script = dir.join("yt-dlp.sh");
    std::fs::write(&script, FAKE_YTDLP).unwrap();

    let mut config = Config::default();
    config.download.temp_dir = dir.join("temp");
    config.tools.ytdlp_path = Some(PathBuf::from("/bin/sh"));
    config.tools.ytdlp_prefix_args = vec![script.display().to_string()];
    config.tools.search_path = false;
    config.server.api.static_dir = None;
    config
}

fn temp_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir.join("temp")).unwrap().next().is_none()
}

#[tokio::test]
async fn http_download_delivers_file_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let orchestrator = Orchestrator::new(config.clone()).await.unwrap();
    let app = media_dl::api::create_router(orchestrator, Arc::new(config));

    let request = Request::builder()
        .method("POST")
        .uri("/api/download")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"url":"https://example.com/v","type":"mp4","quality":"720","taskId":"it-1"}"#,
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        media_dl::utils::filename_from_content_disposition(&disposition).as_deref(),
        Some("Integration_ Clip_.mp4")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"payload");
    assert!(temp_is_empty(dir.path()));
}

#[tokio::test]
async fn library_run_publishes_events_for_its_task() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(config_for(dir.path())).await.unwrap();
    let mut events = orchestrator.subscribe();

    let request = orchestrator
        .prepare(Some("https://example.com/a"), Some("wav"), None, Some("it-2"))
        .unwrap();
    let delivery = orchestrator.run(request).await.unwrap();
    assert_eq!(delivery.file_name(), "Integration_ Clip_.wav");
    assert_eq!(delivery.content_length, 7);

    let mut seen = Vec::new();
    while let Ok(Some(Received::Event(event))) =
        tokio::time::timeout(Duration::from_millis(100), events.recv()).await
    {
        assert_eq!(event.task_id.as_str(), "it-2");
        seen.push((event.status, event.progress));
    }
    assert_eq!(seen.first(), Some(&(Phase::Downloading, 0.0)));
    assert!(seen.contains(&(Phase::Downloading, 50.0)));
    assert_eq!(seen.last(), Some(&(Phase::Complete, 100.0)));

    // An undelivered result still removes its file
    drop(delivery);
    assert!(temp_is_empty(dir.path()));
}
