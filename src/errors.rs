// src/errors.rs

//! Crate-wide error type.
//!
//! Library operations return [`Result`]; task implementations and the
//! filesystem abstraction stay on `anyhow` and are folded into
//! [`DirflowError`] at the workflow boundary.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirflowError {
    /// The OS change-notification facility could not be created.
    #[error("watcher initialization failed: {0}")]
    InitializationError(String),

    /// A single path could not be registered with a live watcher.
    #[error("cannot watch {path:?}: {source}")]
    WatchError {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("{0:?}: no such file or directory")]
    PathNotFound(String),

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Lifecycle misuse: stop before start, double stop, or stop while
    /// `start` has not finished bringing the watcher up.
    #[error("not running: {0}")]
    NotRunningError(String),

    #[error("already running: {0}")]
    AlreadyRunning(String),

    /// A task chain aborted. `source_path` is the input of the failing task.
    #[error("workflow '{workflow}' failed for {source_path:?}: {message}")]
    TaskError {
        workflow: String,
        source_path: PathBuf,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DirflowError {
    /// True for the lifecycle-misuse family (`stop` without a running pipeline).
    pub fn is_not_running(&self) -> bool {
        matches!(self, DirflowError::NotRunningError(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DirflowError>;
