//! Custom error types for the configuration backup workflow.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure kinds surfaced by a device session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Session timed out: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inventory error at line {line}: {reason}")]
    Inventory { line: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Artifact already exists: {0}")]
    ArtifactExists(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Archive {} created but the backup tree could not be removed: {source}", .archive.display())]
    Cleanup {
        archive: PathBuf,
        source: std::io::Error,
    },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;
