// src/exec/progress.rs

//! Progress normalization for the transcoder's stderr stream.
//!
//! ffmpeg prints the input header once (`Duration: 00:01:30.50, ...`) and
//! then rewrites a stats line (`frame= .. time=00:00:12.34 ..`) as it
//! encodes. The parser folds those into a uniform 0–100 integer:
//!
//! - percent = elapsed / total duration, rounded, clamped to [0, 100]
//! - with no known total duration, the last known percent is reported
//!   unchanged rather than guessed
//! - the reported percent never decreases

use std::sync::LazyLock;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("duration regex")
});

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("time regex"));

/// One normalized progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// 0–100, rounded.
    pub percent: u8,
    /// Human time-mark string as printed by the tool (`HH:MM:SS.ff`).
    pub timemark: String,
}

/// Stateful parser for one process's stderr stream.
#[derive(Debug, Default)]
pub struct ProgressParser {
    total_secs: Option<f64>,
    last_percent: u8,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stderr line; returns an update when the line carried a
    /// `time=` marker. Unparseable lines degrade progress reporting, they
    /// never fail the job.
    pub fn push_line(&mut self, line: &str) -> Option<ProgressUpdate> {
        // The first Duration header belongs to the primary input; later ones
        // (e.g. a watermark's second input) are ignored.
        if self.total_secs.is_none()
            && let Some(caps) = DURATION_RE.captures(line)
        {
            self.total_secs = Some(captured_secs(&caps));
        }

        let caps = TIME_RE.captures(line)?;
        let elapsed = captured_secs(&caps);
        let timemark = caps
            .get(0)
            .map(|m| m.as_str().trim_start_matches("time=").to_string())
            .unwrap_or_default();

        let percent = match self.total_secs {
            Some(total) if total > 0.0 => {
                ((elapsed / total) * 100.0).round().clamp(0.0, 100.0) as u8
            }
            // Elapsed time with no known total: hold the last value.
            _ => self.last_percent,
        };

        let percent = percent.max(self.last_percent);
        self.last_percent = percent;

        Some(ProgressUpdate { percent, timemark })
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }
}

fn captured_secs(caps: &regex::Captures<'_>) -> f64 {
    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    part(1) * 3600.0 + part(2) * 60.0 + part(3)
}
