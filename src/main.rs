use clap::Parser;
use media_dl::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Download media through yt-dlp and stream it to the browser
#[derive(Debug, Parser)]
#[command(name = "media-dl", version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, env = "MEDIA_DL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long, env = "MEDIA_DL_BIND")]
    bind: Option<SocketAddr>,

    /// Directory for in-flight artifacts (overrides the config file)
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Directory of static assets served at `/` (overrides the config file)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Path to the yt-dlp executable (overrides the config file)
    #[arg(long)]
    ytdlp: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), media_dl::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.server.api.bind_address = bind;
    }
    if let Some(dir) = args.temp_dir {
        config.download.temp_dir = dir;
    }
    if let Some(dir) = args.static_dir {
        config.server.api.static_dir = Some(dir);
    }
    if let Some(path) = args.ytdlp {
        config.tools.ytdlp_path = Some(path);
    }

    media_dl::run_with_shutdown(config).await
}
