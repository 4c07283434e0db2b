//! Downloader output → progress events
//!
//! [`parse_progress`] is a pure function of one output line. It does not clamp
//! or order anything; [`ProgressTracker`] applies the per-task rules before
//! events are published.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{Phase, ProgressEvent, TaskId};

/// Percentage pinned on the merge step
pub const MERGING_PERCENT: f64 = 99.0;

/// Marker the downloader prints when it combines streams
pub const MERGE_MARKER: &str = "Merging";

/// Progress extracted from a single line
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedProgress {
    /// Percentage as printed (not clamped)
    pub percent: f64,
    /// Downloading or Merging
    pub phase: Phase,
    /// Speed text, e.g. "2.50MiB/s"
    pub speed: Option<String>,
    /// ETA text, e.g. "00:12"
    pub eta: Option<String>,
}

#[allow(clippy::expect_used)]
fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent pattern is valid"))
}

#[allow(clippy::expect_used)]
fn speed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bat\s+(\S+/s)\b").expect("speed pattern is valid"))
}

#[allow(clippy::expect_used)]
fn eta_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bETA\s+(\d[\d:]*)").expect("eta pattern is valid"))
}

/// Map one raw output line to at most one progress reading
///
/// - A line containing the merge marker yields Merging at 99%, whatever else
///   it contains.
/// - Otherwise the first `<number>%` yields Downloading at that number.
/// - Anything else yields nothing.
///
/// ```
/// use media_dl::progress::parse_progress;
/// use media_dl::types::Phase;
///
/// let p = parse_progress("[download]  42.3% of 10.00MiB at 1.20MiB/s ETA 00:07").unwrap();
/// assert_eq!(p.percent, 42.3);
/// assert_eq!(p.phase, Phase::Downloading);
/// assert_eq!(p.eta.as_deref(), Some("00:07"));
///
/// let m = parse_progress("[Merger] Merging formats into \"out.mp4\"").unwrap();
/// assert_eq!((m.percent, m.phase), (99.0, Phase::Merging));
///
/// assert!(parse_progress("[youtube] abc: Downloading webpage").is_none());
/// ```
pub fn parse_progress(line: &str) -> Option<ParsedProgress> {
    if line.contains(MERGE_MARKER) {
        return Some(ParsedProgress {
            percent: MERGING_PERCENT,
            phase: Phase::Merging,
            speed: None,
            eta: None,
        });
    }

    let caps = percent_re().captures(line)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    if !percent.is_finite() {
        return None;
    }

    Some(ParsedProgress {
        percent,
        phase: Phase::Downloading,
        speed: capture_text(speed_re(), line),
        eta: capture_text(eta_re(), line),
    })
}

fn capture_text(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Per-task filter between the parser and the event bus
///
/// - clamps percentages to 0-100
/// - never goes back from Merging to Downloading
/// - emits Merging once
/// - suppresses a reading identical to the previous one
///
/// A lower Downloading percentage is passed through: the downloader fetches
/// video and audio as separate streams, each counting from zero.
#[derive(Debug)]
pub struct ProgressTracker {
    task_id: TaskId,
    phase: Phase,
    last_percent: f64,
}

impl ProgressTracker {
    /// Start tracking a task that has just begun downloading
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            phase: Phase::Downloading,
            last_percent: 0.0,
        }
    }

    /// Last published phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last published percentage
    pub fn last_percent(&self) -> f64 {
        self.last_percent
    }

    /// The event announcing the start of the fetch
    pub fn started(&self) -> ProgressEvent {
        ProgressEvent::new(self.task_id.clone(), 0.0, Phase::Downloading)
    }

    /// Decide whether a parsed reading becomes a published event
    pub fn admit(&mut self, parsed: ParsedProgress) -> Option<ProgressEvent> {
        if self.phase.is_terminal() {
            return None;
        }

        let percent = parsed.percent.clamp(0.0, 100.0);
        match (self.phase, parsed.phase) {
            (Phase::Merging, Phase::Downloading) => return None,
            (Phase::Merging, Phase::Merging) => return None,
            (Phase::Downloading, Phase::Downloading) if percent == self.last_percent => {
                return None;
            }
            _ => {}
        }

        self.phase = parsed.phase;
        self.last_percent = percent;
        Some(ProgressEvent {
            task_id: self.task_id.clone(),
            progress: percent,
            status: parsed.phase,
            speed: parsed.speed,
            eta: parsed.eta,
        })
    }

    /// The terminal success event, always at exactly 100%
    pub fn complete(&mut self) -> ProgressEvent {
        self.phase = Phase::Complete;
        self.last_percent = 100.0;
        ProgressEvent::new(self.task_id.clone(), 100.0, Phase::Complete)
    }

    /// The terminal failure event, carrying the last known percentage
    pub fn failed(&mut self) -> ProgressEvent {
        self.phase = Phase::Failed;
        ProgressEvent::new(self.task_id.clone(), self.last_percent, Phase::Failed)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_extracted_regardless_of_surroundings() {
        let cases = [
            ("[download]   0.0% of ~ 12.00MiB", 0.0),
            ("[download]  12.5% of 48.31MiB at  3.21MiB/s ETA 00:11", 12.5),
            ("57.25%", 57.25),
            ("prefix text 99.9% suffix text", 99.9),
            ("[download] 100% of 48.31MiB in 00:00:09", 100.0),
            ("[#1 SIZE:1.2MiB/3.4MiB(35%) CN:16 DL:2.1MiB]", 35.0),
        ];

        for (line, expected) in cases {
            let parsed = parse_progress(line).unwrap_or_else(|| panic!("no event for {line:?}"));
            assert_eq!(parsed.percent, expected, "line: {line:?}");
            assert_eq!(parsed.phase, Phase::Downloading);
        }
    }

    #[test]
    fn merge_marker_pins_ninety_nine() {
        for line in [
            "[Merger] Merging formats into \"temp/1_a.mp4\"",
            "Merging 45.0% of something",
            "Merging",
        ] {
            let parsed = parse_progress(line).unwrap();
            assert_eq!(parsed.percent, 99.0);
            assert_eq!(parsed.phase, Phase::Merging);
        }
    }

    #[test]
    fn unrelated_lines_yield_nothing() {
        for line in [
            "",
            "[youtube] Extracting URL: https://example.com/v",
            "[info] abc: Downloading 1 format(s): 137+140",
            "percent sign alone %",
            "ERROR: unable to download video data",
        ] {
            assert!(parse_progress(line).is_none(), "line: {line:?}");
        }
    }

    #[test]
    fn speed_and_eta_are_optional_details() {
        let parsed =
            parse_progress("[download]  45.3% of 10.00MiB at 1.23MiB/s ETA 00:05").unwrap();
        assert_eq!(parsed.speed.as_deref(), Some("1.23MiB/s"));
        assert_eq!(parsed.eta.as_deref(), Some("00:05"));

        let parsed = parse_progress("[download]  45.3% of 10.00MiB at Unknown B/s ETA Unknown")
            .unwrap();
        assert!(parsed.speed.is_none());
        assert!(parsed.eta.is_none());
    }

    fn reading(percent: f64, phase: Phase) -> ParsedProgress {
        ParsedProgress {
            percent,
            phase,
            speed: None,
            eta: None,
        }
    }

    #[test]
    fn tracker_stamps_task_and_clamps() {
        let mut tracker = ProgressTracker::new(TaskId::from("A"));

        let event = tracker.admit(reading(150.0, Phase::Downloading)).unwrap();
        assert_eq!(event.task_id, "A");
        assert_eq!(event.progress, 100.0);
    }

    #[test]
    fn tracker_suppresses_duplicates_and_allows_stream_reset() {
        let mut tracker = ProgressTracker::new(TaskId::from("A"));

        assert!(tracker.admit(reading(50.0, Phase::Downloading)).is_some());
        assert!(tracker.admit(reading(50.0, Phase::Downloading)).is_none());
        assert!(tracker.admit(reading(100.0, Phase::Downloading)).is_some());
        // second stream (audio) starts over
        let reset = tracker.admit(reading(3.0, Phase::Downloading)).unwrap();
        assert_eq!(reset.progress, 3.0);
        assert_eq!(tracker.last_percent(), 3.0);
    }

    #[test]
    fn tracker_never_leaves_merging_for_downloading() {
        let mut tracker = ProgressTracker::new(TaskId::from("A"));

        assert!(tracker.admit(reading(80.0, Phase::Downloading)).is_some());
        let merging = tracker.admit(reading(99.0, Phase::Merging)).unwrap();
        assert_eq!(merging.status, Phase::Merging);

        assert!(tracker.admit(reading(99.0, Phase::Merging)).is_none());
        assert!(tracker.admit(reading(100.0, Phase::Downloading)).is_none());
        assert_eq!(tracker.phase(), Phase::Merging);
    }

    #[test]
    fn terminal_events() {
        let mut tracker = ProgressTracker::new(TaskId::from("A"));
        tracker.admit(reading(37.5, Phase::Downloading));

        let failed = tracker.failed();
        assert_eq!(failed.status, Phase::Failed);
        assert_eq!(failed.progress, 37.5);
        assert!(tracker.admit(reading(40.0, Phase::Downloading)).is_none());

        let mut tracker = ProgressTracker::new(TaskId::from("B"));
        let complete = tracker.complete();
        assert_eq!(complete.progress, 100.0);
        assert_eq!(complete.status, Phase::Complete);
    }
}
