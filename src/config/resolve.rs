// src/config/resolve.rs

//! Turning a raw config file into a [`ResolvedConfig`].
//!
//! Resolution prefers a system installation and falls back to a bundled
//! copy, matching how the surrounding application locates its tools:
//! explicit configured path, else the first hit on `PATH`, else
//! `fallback_dir/<name>`.

use std::env;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{RawConfigFile, ResolvedConfig};
use crate::errors::{EngineError, Result};

pub fn resolve(raw: &RawConfigFile) -> Result<ResolvedConfig> {
    let ffmpeg = resolve_tool(
        raw.tools.ffmpeg.as_deref(),
        raw.tools.fallback_dir.as_deref(),
        "ffmpeg",
    )?;
    let ffprobe = resolve_tool(
        raw.tools.ffprobe.as_deref(),
        raw.tools.fallback_dir.as_deref(),
        "ffprobe",
    )?;

    let output_dir = match &raw.engine.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    if !output_dir.is_dir() {
        return Err(EngineError::ConfigError(format!(
            "output_dir is not a directory: {}",
            output_dir.display()
        )));
    }

    let max_concurrent_jobs = match raw.engine.max_concurrent_jobs {
        Some(n) if n > 0 => n,
        _ => default_worker_slots(),
    };

    info!(
        ffmpeg = %ffmpeg.display(),
        ffprobe = %ffprobe.display(),
        output_dir = %output_dir.display(),
        max_concurrent_jobs,
        "configuration resolved"
    );

    Ok(ResolvedConfig {
        ffmpeg,
        ffprobe,
        output_dir,
        max_concurrent_jobs,
    })
}

fn resolve_tool(
    explicit: Option<&Path>,
    fallback_dir: Option<&Path>,
    name: &str,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(EngineError::ConfigError(format!(
            "configured {name} not found at {}",
            path.display()
        )));
    }

    if let Some(path) = find_in_path(name) {
        return Ok(path);
    }

    if let Some(dir) = fallback_dir {
        let bundled = dir.join(name);
        if bundled.is_file() {
            return Ok(bundled);
        }
    }

    Err(EngineError::ConfigError(format!(
        "could not locate '{name}': not configured under [tools], not on PATH, \
         and no bundled copy in fallback_dir"
    )))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn default_worker_slots() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
