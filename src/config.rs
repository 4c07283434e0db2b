//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

use crate::error::{Error, Result};
use crate::runner::Capture;

/// Task behavior configuration (temp storage, defaults, timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory holding in-flight artifacts (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Height ceiling used when a request names no quality (default: 1080)
    #[serde(default = "default_quality")]
    pub default_quality: u32,

    /// Title used when the title lookup fails or times out (default: "download")
    #[serde(default = "default_title")]
    pub default_title: String,

    /// Time budget for the title lookup (default: 8s)
    #[serde(default = "default_title_timeout", with = "duration_millis")]
    pub title_timeout: Duration,

    /// Capacity of the progress event channel (default: 1000)
    ///
    /// A subscriber that falls this many events behind skips ahead and is
    /// told how many events it missed.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Which downloader output streams are scanned for progress (default: both)
    ///
    /// yt-dlp writes `[download]` lines to stdout and its merger and error
    /// output to stderr.
    #[serde(default)]
    pub progress_streams: Capture,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            default_quality: default_quality(),
            default_title: default_title(),
            title_timeout: default_title_timeout(),
            event_capacity: default_event_capacity(),
            progress_streams: Capture::default(),
        }
    }
}

/// External tool paths and acceleration options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Arguments placed before every yt-dlp invocation
    ///
    /// Lets yt-dlp run through an interpreter, e.g. `ytdlp_path = "python3"`
    /// with `ytdlp_prefix_args = ["-m", "yt_dlp"]`.
    #[serde(default)]
    pub ytdlp_prefix_args: Vec<String>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Parallel fragment downloads (default: 16)
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,

    /// Download buffer size (default: "16M")
    #[serde(default = "default_buffer_size")]
    pub buffer_size: String,

    /// External accelerated downloader (default: "aria2c", None disables)
    #[serde(default = "default_external_downloader")]
    pub external_downloader: Option<String>,

    /// Arguments handed to the external downloader
    #[serde(default = "default_external_downloader_args")]
    pub external_downloader_args: String,

    /// Post-processor arguments for video merges
    #[serde(default = "default_postprocessor_args")]
    pub postprocessor_args: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ytdlp_prefix_args: Vec::new(),
            search_path: true,
            concurrent_fragments: default_concurrent_fragments(),
            buffer_size: default_buffer_size(),
            external_downloader: default_external_downloader(),
            external_downloader_args: default_external_downloader_args(),
            postprocessor_args: default_postprocessor_args(),
        }
    }
}

/// Main configuration for media-dl
///
/// Sub-configs are flattened, so a JSON config file is a flat object with
/// only the API settings nested:
///
/// ```json
/// { "temp_dir": "/var/tmp/media-dl", "title_timeout": 5000, "api": { "bind_address": "127.0.0.1:3000" } }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths and acceleration options
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// API server settings
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a configuration from a JSON file, filling in defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every task fail
    pub fn validate(&self) -> Result<()> {
        if self.download.title_timeout.is_zero() {
            return Err(Error::Config {
                message: "title_timeout must be greater than zero".into(),
                key: Some("title_timeout".into()),
            });
        }
        if self.download.event_capacity == 0 {
            return Err(Error::Config {
                message: "event_capacity must be greater than zero".into(),
                key: Some("event_capacity".into()),
            });
        }
        if self.download.default_quality == 0 {
            return Err(Error::Config {
                message: "default_quality must be greater than zero".into(),
                key: Some("default_quality".into()),
            });
        }
        Ok(())
    }

    /// Temporary directory
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Directory of static assets served at `/` (default: "public")
    ///
    /// Ignored when the directory does not exist.
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            static_dir: default_static_dir(),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

// Default value functions
fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_quality() -> u32 {
    1080
}

fn default_title() -> String {
    "download".into()
}

fn default_title_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_event_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_concurrent_fragments() -> u32 {
    16
}

fn default_buffer_size() -> String {
    "16M".into()
}

fn default_external_downloader() -> Option<String> {
    Some("aria2c".into())
}

fn default_external_downloader_args() -> String {
    "aria2c:-x 16 -s 16 -j 16 -k 1M".into()
}

fn default_postprocessor_args() -> String {
    "ffmpeg:-threads 0 -preset superfast".into()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_static_dir() -> Option<PathBuf> {
    Some(PathBuf::from("public"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();

        assert_eq!(config.download.title_timeout, Duration::from_secs(8));
        assert_eq!(config.download.default_quality, 1080);
        assert_eq!(config.download.default_title, "download");
        assert_eq!(config.tools.concurrent_fragments, 16);
        assert_eq!(config.tools.external_downloader.as_deref(), Some("aria2c"));
        assert_eq!(config.server.api.bind_address.port(), 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert_eq!(config.download.temp_dir, PathBuf::from("temp"));
        assert_eq!(config.download.event_capacity, 1000);
        assert_eq!(config.download.progress_streams, Capture::Both);
        assert!(config.tools.search_path);
        assert!(config.server.api.cors_enabled);
    }

    #[test]
    fn flat_json_fields_reach_sub_configs() {
        let json = r#"{
            "temp_dir": "/var/tmp/media",
            "title_timeout": 2500,
            "ytdlp_path": "/opt/yt-dlp",
            "external_downloader": null,
            "api": { "bind_address": "127.0.0.1:8080" }
        }"#;
        let config: Config = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.download.temp_dir, PathBuf::from("/var/tmp/media"));
        assert_eq!(config.download.title_timeout, Duration::from_millis(2500));
        assert_eq!(config.tools.ytdlp_path, Some(PathBuf::from("/opt/yt-dlp")));
        assert!(config.tools.external_downloader.is_none());
        assert_eq!(config.server.api.bind_address.port(), 8080);
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.download.title_timeout = Duration::ZERO;

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("title_timeout")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.download.event_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_json_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{"default_quality": 720}"#).unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.download.default_quality, 720);

        std::fs::write(&path, r#"{"default_quality": 0}"#).unwrap();
        assert!(Config::from_json_file(&path).is_err());

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Config::from_json_file(&missing),
            Err(Error::Config { .. })
        ));
    }
}
