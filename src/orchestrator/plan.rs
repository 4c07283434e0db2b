//! Downloader discovery and command-line construction

use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::types::{MediaKind, QualityCeiling, ToolInfo};

/// Executable name searched for on PATH
pub const DOWNLOADER_NAME: &str = "yt-dlp";

/// The downloader executable and the arguments that always precede its own
#[derive(Clone, Debug)]
pub struct Downloader {
    program: PathBuf,
    prefix_args: Vec<String>,
    resolved: Option<PathBuf>,
}

impl Downloader {
    /// Locate the downloader per configuration
    ///
    /// An explicit `ytdlp_path` wins. Otherwise PATH is searched (if allowed),
    /// and failing that the bare name is used so the OS gets the final say at
    /// spawn time.
    pub fn resolve(tools: &ToolsConfig) -> Self {
        let (program, resolved) = match &tools.ytdlp_path {
            Some(path) => (path.clone(), path.exists().then(|| path.clone())),
            None if tools.search_path => match which::which(DOWNLOADER_NAME) {
                Ok(found) => (found.clone(), Some(found)),
                Err(_) => (PathBuf::from(DOWNLOADER_NAME), None),
            },
            None => (PathBuf::from(DOWNLOADER_NAME), None),
        };

        Self {
            program,
            prefix_args: tools.ytdlp_prefix_args.clone(),
            resolved,
        }
    }

    /// The executable to spawn
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Availability as reported by the capabilities endpoint
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.program.display().to_string(),
            path: self.resolved.clone(),
            available: self.resolved.is_some(),
        }
    }

    /// Arguments for the title lookup
    pub fn title_args(&self, url: &str) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        args.extend(
            ["--get-title", "--no-playlist", "--encoding", "utf-8", "--", url]
                .into_iter()
                .map(String::from),
        );
        args
    }

    /// Arguments for the fetch that writes the artifact to `output`
    pub fn fetch_args(
        &self,
        tools: &ToolsConfig,
        kind: MediaKind,
        quality: QualityCeiling,
        output: &Path,
        url: &str,
    ) -> Vec<String> {
        let mut args = self.prefix_args.clone();

        match kind {
            MediaKind::Audio => {
                args.extend(
                    ["-x", "--audio-format", "wav", "--audio-quality", "0"]
                        .into_iter()
                        .map(String::from),
                );
            }
            MediaKind::Video => {
                args.push("-f".into());
                args.push(video_format_selector(quality));
                args.push("--merge-output-format".into());
                args.push("mp4".into());
                if !tools.postprocessor_args.is_empty() {
                    args.push("--postprocessor-args".into());
                    args.push(tools.postprocessor_args.clone());
                }
            }
        }

        args.push("--no-playlist".into());
        args.push("--newline".into());
        args.push("--concurrent-fragments".into());
        args.push(tools.concurrent_fragments.to_string());
        args.push("--buffer-size".into());
        args.push(tools.buffer_size.clone());

        if let Some(external) = &tools.external_downloader {
            args.push("--downloader".into());
            args.push(external.clone());
            if !tools.external_downloader_args.is_empty() {
                args.push("--downloader-args".into());
                args.push(tools.external_downloader_args.clone());
            }
        }

        args.push("-o".into());
        args.push(output.display().to_string());
        args.push("--".into());
        args.push(url.to_string());
        args
    }
}

/// Availability of the configured external downloader, if any
pub fn external_downloader_info(tools: &ToolsConfig) -> Option<ToolInfo> {
    let name = tools.external_downloader.as_ref()?;
    let resolved = which::which(name).ok();
    Some(ToolInfo {
        name: name.clone(),
        available: resolved.is_some(),
        path: resolved,
    })
}

/// Best MP4 video at or below the ceiling plus best M4A audio, falling back to
/// a pre-muxed MP4, then to whatever is best
pub fn video_format_selector(quality: QualityCeiling) -> String {
    let h = quality.height();
    format!("bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best")
}
