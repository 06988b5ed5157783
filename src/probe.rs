// src/probe.rs

//! Metadata probe: synchronous request/response against the probing binary.
//!
//! Independent of the job engine; the surrounding application uses it for
//! display. ffprobe's JSON mode prints numbers as strings, hence the typed
//! accessors.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::catalog::ValidationError;
use crate::errors::{EngineError, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub format: FormatInfo,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormatInfo {
    pub format_name: Option<String>,
    pub format_long_name: Option<String>,
    pub duration: Option<String>,
    pub size: Option<String>,
    pub bit_rate: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamInfo {
    pub index: Option<u32>,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<String>,
    pub sample_rate: Option<String>,
    pub channels: Option<u32>,
}

impl MediaInfo {
    /// Container duration in seconds, when the tool reported one.
    pub fn duration_secs(&self) -> Option<f64> {
        self.format.duration.as_deref()?.parse().ok()
    }
}

/// Probe a media file for structured container/stream metadata.
pub async fn probe_file(ffprobe: &Path, file: &Path) -> Result<MediaInfo> {
    if !file.is_file() {
        return Err(ValidationError::InputNotFound(file.to_path_buf()).into());
    }

    debug!(file = %file.display(), "probing media file");

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(file)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("ffprobe exited with status {}", output.status)
        } else {
            stderr.trim().to_string()
        };
        return Err(EngineError::ProbeFailed(message));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| EngineError::ProbeFailed(format!("unparseable ffprobe output: {e}")))
}
