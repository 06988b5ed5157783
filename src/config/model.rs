// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file:
///
/// ```toml
/// [tools]
/// ffmpeg = "/usr/local/bin/ffmpeg"
/// fallback_dir = "vendor/bin"
///
/// [engine]
/// output_dir = "/home/me/Downloads"
/// max_concurrent_jobs = 4
/// ```
///
/// All sections are optional and have reasonable defaults; tool paths are
/// resolved against the system `PATH` when not given explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// External binary locations from `[tools]`.
    #[serde(default)]
    pub tools: ToolsSection,

    /// Engine behaviour from `[engine]`.
    #[serde(default)]
    pub engine: EngineSection,
}

/// `[tools]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsSection {
    /// Explicit transcoding binary path; overrides the `PATH` search.
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    /// Explicit probing binary path; overrides the `PATH` search.
    #[serde(default)]
    pub ffprobe: Option<PathBuf>,

    /// Directory holding bundled copies, used as a last resort when a tool
    /// is neither configured nor on `PATH`.
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    /// Where compiled plans place their output files.
    ///
    /// Defaults to the current working directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Concurrent external process cap. `0` or absent means "available
    /// CPU cores".
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
}

/// Fully resolved configuration: every tool located, every default applied.
///
/// Produced by [`resolve`](crate::config::resolve::resolve) at startup;
/// tool unavailability is a configuration error here, never a per-job one.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub output_dir: PathBuf,
    pub max_concurrent_jobs: usize,
}
