// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum DocpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Watch setup error: {0}")]
    WatchSetup(String),

    #[error("Stylesheet output collision: {0}")]
    StyleCollision(String),

    #[error("Task(s) failed: {}", .0.join(", "))]
    TasksFailed(Vec<TaskName>),

    #[error("Interrupted before the initial run finished")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocpipeError {
    /// Process exit status for this error: 130 (128 + SIGINT) for an
    /// interrupt, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            DocpipeError::Interrupted => 130,
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DocpipeError>;
