// src/errors.rs

//! Crate-wide error types and helpers.

use thiserror::Error;

use crate::catalog::ValidationError;
use crate::registry::JobId;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job id already in use: {0}")]
    DuplicateJob(JobId),

    #[error("engine is shut down")]
    EngineClosed,

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EngineError>;
