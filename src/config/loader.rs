// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawConfigFile, ResolvedConfig};
use crate::config::resolve::resolve;
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** locate tools or
/// apply defaults. Use [`load_and_resolve`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and resolve it for use.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML (a missing file falls back to built-in defaults, since
///   the engine can resolve its tools from `PATH` alone).
/// - Locates the transcoding and probing binaries.
/// - Applies engine defaults (output dir, worker-pool size).
pub fn load_and_resolve(path: impl AsRef<Path>) -> Result<ResolvedConfig> {
    let path = path.as_ref();

    let raw = if path.is_file() {
        load_from_path(path)?
    } else {
        debug!(path = %path.display(), "config file absent; using defaults");
        RawConfigFile::default()
    };

    resolve(&raw)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Mediaforge.toml` in the current working
/// directory; it exists so config discovery can later grow (env var,
/// project-local lookup) without touching callers.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Mediaforge.toml")
}
