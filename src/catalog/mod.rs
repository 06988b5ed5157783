// src/catalog/mod.rs

//! Operation catalog: turns a raw operation request (name + parameter
//! object) into a validated, typed [`OperationDescriptor`].
//!
//! This is the only place where raw parameters are inspected. No job is ever
//! created from an unvalidated request, and no IO happens here beyond the
//! input-file existence check required by the contract.

pub mod timecode;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use timecode::parse_timecode;

/// The fixed set of media operations the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Convert,
    Compress,
    ExtractAudio,
    Trim,
    Resize,
    Watermark,
    Thumbnail,
}

impl OperationKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "convert" => Some(Self::Convert),
            "compress" => Some(Self::Compress),
            "extractAudio" => Some(Self::ExtractAudio),
            "trim" => Some(Self::Trim),
            "resize" => Some(Self::Resize),
            "watermark" => Some(Self::Watermark),
            "thumbnail" => Some(Self::Thumbnail),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Convert => "convert",
            Self::Compress => "compress",
            Self::ExtractAudio => "extractAudio",
            Self::Trim => "trim",
            Self::Resize => "resize",
            Self::Watermark => "watermark",
            Self::Thumbnail => "thumbnail",
        }
    }

    /// Output file name suffix for this kind (`<base>_<suffix>.<ext>`).
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Convert => "converted",
            Self::Compress => "compressed",
            Self::ExtractAudio => "audio",
            Self::Trim => "trimmed",
            Self::Resize => "resized",
            Self::Watermark => "watermarked",
            Self::Thumbnail => "thumb",
        }
    }

    /// Whether the external process reports granular progress while running.
    ///
    /// Thumbnail extraction is a single-shot snapshot with no progress
    /// stream; everything else reports time-based progress.
    pub fn is_incremental(self) -> bool {
        !matches!(self, Self::Thumbnail)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validation failures raised before any process spawns.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Missing required parameter '{0}'")]
    MissingRequiredParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Overlay anchor for the watermark operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl WatermarkPosition {
    /// Lenient parse: unrecognized values fall back to `bottomright`,
    /// preserving the original tool's permissive behaviour.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("topleft") => Self::TopLeft,
            Some("topright") => Self::TopRight,
            Some("bottomleft") => Self::BottomLeft,
            Some("bottomright") | None => Self::BottomRight,
            Some("center") => Self::Center,
            Some(other) => {
                debug!(position = other, "unrecognized watermark position; using bottomright");
                Self::BottomRight
            }
        }
    }

    /// Overlay offset expression, resolved symbolically by the transcoder
    /// against the primary input's frame dimensions `W`,`H`.
    pub fn overlay_offset(self) -> &'static str {
        match self {
            Self::TopLeft => "10:10",
            Self::TopRight => "W-w-10:10",
            Self::BottomLeft => "10:H-h-10",
            Self::BottomRight => "W-w-10:H-h-10",
            Self::Center => "(W-w)/2:(H-h)/2",
        }
    }
}

/// A time value as it arrives in the raw parameter object: either a JSON
/// number (seconds) or a timecode string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TimeValue {
    fn to_seconds(&self, name: &'static str) -> Result<f64, ValidationError> {
        let secs = match self {
            TimeValue::Seconds(s) => *s,
            TimeValue::Text(s) => parse_timecode(s).map_err(|reason| invalid(name, reason))?,
        };
        if !secs.is_finite() || secs < 0.0 {
            return Err(invalid(name, "must be a non-negative duration"));
        }
        Ok(secs)
    }
}

/// Raw parameter object as produced by the submission interface or the
/// upstream natural-language classifier. All fields optional; `classify`
/// decides which are required per operation kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawParams {
    pub input_path: Option<PathBuf>,
    pub output_format: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub quality: Option<f64>,
    pub preset: Option<String>,
    pub audio_format: Option<String>,
    pub start_time: Option<TimeValue>,
    pub end_time: Option<TimeValue>,
    pub duration: Option<TimeValue>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: Option<String>,
    pub watermark_path: Option<PathBuf>,
    pub position: Option<String>,
    pub timestamp: Option<TimeValue>,
}

/// Immutable, validated description of one operation.
///
/// Each variant carries only the fields relevant to its kind; defaults have
/// already been applied and time values reduced to seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationDescriptor {
    Convert {
        input: PathBuf,
        output_format: String,
        video_codec: Option<String>,
        audio_codec: Option<String>,
    },
    Compress {
        input: PathBuf,
        crf: u8,
        preset: String,
    },
    ExtractAudio {
        input: PathBuf,
        audio_format: String,
    },
    Trim {
        input: PathBuf,
        start_secs: f64,
        /// `None` means "rest of file"; no duration argument is emitted.
        duration_secs: Option<f64>,
    },
    Resize {
        input: PathBuf,
        /// Scale target as `WxH`.
        scale: String,
    },
    Watermark {
        input: PathBuf,
        watermark: PathBuf,
        position: WatermarkPosition,
    },
    Thumbnail {
        input: PathBuf,
        timestamp_secs: f64,
    },
}

impl OperationDescriptor {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Convert { .. } => OperationKind::Convert,
            Self::Compress { .. } => OperationKind::Compress,
            Self::ExtractAudio { .. } => OperationKind::ExtractAudio,
            Self::Trim { .. } => OperationKind::Trim,
            Self::Resize { .. } => OperationKind::Resize,
            Self::Watermark { .. } => OperationKind::Watermark,
            Self::Thumbnail { .. } => OperationKind::Thumbnail,
        }
    }

    pub fn input(&self) -> &Path {
        match self {
            Self::Convert { input, .. }
            | Self::Compress { input, .. }
            | Self::ExtractAudio { input, .. }
            | Self::Trim { input, .. }
            | Self::Resize { input, .. }
            | Self::Watermark { input, .. }
            | Self::Thumbnail { input, .. } => input,
        }
    }
}

/// Default CRF when no quality percentage is supplied.
const DEFAULT_CRF: u8 = 28;

/// Map a quality percentage (1–100, higher = better) onto the encoder's
/// constant-rate-factor scale: 100 → 18, 10 → 47.
fn crf_from_quality(percent: f64) -> Result<u8, ValidationError> {
    if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
        return Err(invalid("quality", "must be a percentage in (0, 100]"));
    }
    Ok((18.0 + (100.0 - percent) / 100.0 * 33.0) as u8)
}

/// Classify a raw operation request into a validated descriptor.
///
/// The input path must reference an existing, readable file at validation
/// time; this is the catalog's only filesystem touch.
pub fn classify(
    name: &str,
    raw_params: serde_json::Value,
) -> Result<OperationDescriptor, ValidationError> {
    let kind = OperationKind::from_name(name)
        .ok_or_else(|| ValidationError::UnknownOperation(name.to_string()))?;

    let params: RawParams = serde_json::from_value(raw_params)
        .map_err(|e| invalid("params", e.to_string()))?;

    let input = params
        .input_path
        .clone()
        .ok_or(ValidationError::MissingRequiredParameter("inputPath"))?;
    if !input.is_file() {
        return Err(ValidationError::InputNotFound(input));
    }

    let descriptor = match kind {
        OperationKind::Convert => OperationDescriptor::Convert {
            input,
            output_format: params.output_format.unwrap_or_else(|| "mp4".to_string()),
            video_codec: params.video_codec,
            audio_codec: params.audio_codec,
        },

        OperationKind::Compress => OperationDescriptor::Compress {
            input,
            crf: match params.quality {
                Some(q) => crf_from_quality(q)?,
                None => DEFAULT_CRF,
            },
            preset: params.preset.unwrap_or_else(|| "medium".to_string()),
        },

        OperationKind::ExtractAudio => OperationDescriptor::ExtractAudio {
            input,
            audio_format: params.audio_format.unwrap_or_else(|| "mp3".to_string()),
        },

        OperationKind::Trim => {
            let start_secs = match &params.start_time {
                Some(t) => t.to_seconds("startTime")?,
                None => 0.0,
            };
            let duration_secs = match (&params.end_time, &params.duration) {
                (Some(end), _) => {
                    let end_secs = end.to_seconds("endTime")?;
                    if end_secs < start_secs {
                        return Err(invalid("endTime", "must not be before startTime"));
                    }
                    Some(end_secs - start_secs)
                }
                (None, Some(duration)) => Some(duration.to_seconds("duration")?),
                (None, None) => None,
            };
            OperationDescriptor::Trim {
                input,
                start_secs,
                duration_secs,
            }
        }

        OperationKind::Resize => {
            let scale = match (params.width, params.height) {
                (Some(w), Some(h)) => {
                    if w == 0 || h == 0 {
                        return Err(invalid("width", "dimensions must be non-zero"));
                    }
                    format!("{w}x{h}")
                }
                _ => params.size.unwrap_or_else(|| "1280x720".to_string()),
            };
            validate_scale(&scale)?;
            OperationDescriptor::Resize { input, scale }
        }

        OperationKind::Watermark => OperationDescriptor::Watermark {
            input,
            watermark: params
                .watermark_path
                .ok_or(ValidationError::MissingRequiredParameter("watermarkPath"))?,
            position: WatermarkPosition::parse_lenient(params.position.as_deref()),
        },

        OperationKind::Thumbnail => OperationDescriptor::Thumbnail {
            input,
            timestamp_secs: match &params.timestamp {
                Some(t) => t.to_seconds("timestamp")?,
                None => 5.0,
            },
        },
    };

    Ok(descriptor)
}

fn validate_scale(scale: &str) -> Result<(), ValidationError> {
    let valid = match scale.split_once('x') {
        Some((w, h)) => {
            w.parse::<u32>().map(|v| v > 0).unwrap_or(false)
                && h.parse::<u32>().map(|v| v > 0).unwrap_or(false)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(invalid("size", format!("expected WxH, got '{scale}'")))
    }
}
