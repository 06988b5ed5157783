// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `mediaforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mediaforge",
    version,
    about = "Run media-processing jobs through an external transcoder.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Mediaforge.toml` in the current working directory; when
    /// absent, tools are resolved from PATH and output goes to the
    /// current directory.
    #[arg(long, value_name = "PATH", default_value = "Mediaforge.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MEDIAFORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Submit one operation and run it to completion.
    Submit {
        /// Operation name (convert, compress, extractAudio, trim, resize,
        /// watermark, thumbnail).
        #[arg(long, value_name = "NAME")]
        operation: String,

        /// Raw parameter object as JSON, e.g.
        /// `{"inputPath": "in.mp4", "outputFormat": "webm"}`.
        #[arg(long, value_name = "JSON")]
        params: String,

        /// Human-readable label; defaults to the operation name.
        #[arg(long)]
        label: Option<String>,

        /// Caller-supplied job id for correlation; generated if omitted.
        #[arg(long, value_name = "ID")]
        job_id: Option<String>,
    },

    /// Print structured media metadata for a file as JSON.
    Probe {
        /// The media file to inspect.
        file: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
