//! Shared test helpers: a scripted stand-in for yt-dlp.
//!
//! The fake is a shell script run through `/bin/sh` (configured as the
//! downloader with the script as its first prefix argument), so no
//! executable bit or PATH setup is needed.

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// How the fake answers `--get-title`
#[derive(Clone, Copy, Debug)]
pub(crate) enum TitleBehavior {
    /// Print this title and exit 0 (must not contain `'`)
    Print(&'static str),
    /// Never answer
    Hang,
}

/// How the fake performs the fetch
#[derive(Clone, Copy, Debug)]
pub(crate) enum FetchBehavior {
    /// Report progress, merge, write `payload` to the `-o` path, exit 0
    Succeed { payload: &'static str },
    /// Report some progress, then exit with this code without writing
    ExitWith(i32),
    /// Exit 0 without writing anything
    NoArtifact,
}

/// A fake downloader living in its own temp directory
pub(crate) struct FakeDownloader {
    pub(crate) dir: TempDir,
    pub(crate) script: PathBuf,
}

impl FakeDownloader {
    pub(crate) fn new(title: TitleBehavior, fetch: FetchBehavior) -> Self {
        Self::with_step_delay(title, fetch, None)
    }

    /// `step_delay` (a `sleep` argument such as `"0.2"`) is inserted between
    /// progress lines so concurrent tasks overlap
    pub(crate) fn with_step_delay(
        title: TitleBehavior,
        fetch: FetchBehavior,
        step_delay: Option<&'static str>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-yt-dlp.sh");
        let args_log = dir.path().join("fetch.args");

        let title_section = match title {
            TitleBehavior::Print(t) => format!("echo '{t}'; exit 0"),
            TitleBehavior::Hang => "exec sleep 30".to_string(),
        };
        let pause = step_delay
            .map(|d| format!("sleep {d}"))
            .unwrap_or_else(|| ":".to_string());
        let fetch_section = match fetch {
            FetchBehavior::Succeed { payload } => format!(
                "echo '[download]  10.0% of 1.00MiB at 1.00MiB/s ETA 00:01'\n\
                 {pause}\n\
                 echo '[download]  55.5% of 1.00MiB' >&2\n\
                 {pause}\n\
                 echo '[download] 100.0% of 1.00MiB'\n\
                 echo '[Merger] Merging formats into \"'\"$out\"'\"'\n\
                 printf '%s' '{payload}' > \"$out\"\n\
                 exit 0"
            ),
            FetchBehavior::ExitWith(code) => format!(
                "echo '[download]  12.5% of 1.00MiB'\n\
                 {pause}\n\
                 echo 'ERROR: unable to download video data' >&2\n\
                 exit {code}"
            ),
            FetchBehavior::NoArtifact => "echo '[download] 100.0% of 1.00MiB'\nexit 0".to_string(),
        };

        let body = format!(
            "case \" $* \" in\n\
             *' --get-title '*) {title_section} ;;\n\
             esac\n\
             : > '{log}'\n\
             for a in \"$@\"; do printf '%s\\n' \"$a\" >> '{log}'; done\n\
             out=''\n\
             prev=''\n\
             for a in \"$@\"; do\n\
               if [ \"$prev\" = '-o' ]; then out=\"$a\"; fi\n\
               prev=\"$a\"\n\
             done\n\
             {fetch_section}\n",
            log = args_log.display(),
        );
        std::fs::write(&script, body).unwrap();

        Self { dir, script }
    }

    /// A configuration that runs this fake and keeps artifacts in its dir
    pub(crate) fn config(&self) -> Config {
        let mut config = Config::default();
        config.download.temp_dir = self.temp_dir();
        config.download.title_timeout = Duration::from_secs(5);
        config.tools.ytdlp_path = Some(PathBuf::from("/bin/sh"));
        config.tools.ytdlp_prefix_args = vec![self.script.display().to_string()];
        config.tools.search_path = false;
        config.server.api.static_dir = None;
        config
    }

    pub(crate) async fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.config()).await.unwrap()
    }

    pub(crate) fn temp_dir(&self) -> PathBuf {
        self.dir.path().join("temp")
    }

    /// Arguments of the last fetch invocation (prefix args excluded)
    pub(crate) fn fetch_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("fetch.args"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    /// Files currently in the temp dir
    pub(crate) fn temp_files(&self) -> Vec<String> {
        match std::fs::read_dir(self.temp_dir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
