// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Installation at {} is invalid, missing executables: {missing:?}", .directory.display())]
    InstallationInvalid {
        directory: PathBuf,
        missing: Vec<PathBuf>,
    },

    #[error("Task '{task}' failed with exit code {code}")]
    ActionFailure { task: String, code: i32 },

    #[error("Download of {url} failed: {reason}")]
    DownloadError { url: String, reason: String },

    #[error("Extraction of {} failed: {reason}", .archive.display())]
    ExtractionError { archive: PathBuf, reason: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrontdagError {
    /// Wrap a failure from the filesystem boundary as an `IoError`, keeping
    /// the underlying `io::ErrorKind` when the chain carries one.
    pub fn io(err: anyhow::Error) -> Self {
        let kind = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<std::io::Error>())
            .map(std::io::Error::kind)
            .unwrap_or(std::io::ErrorKind::Other);
        FrontdagError::IoError(std::io::Error::new(kind, format!("{err:#}")))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FrontdagError>;
