//! Error types for frio-bench
//!
//! This module defines the error hierarchy that covers:
//! - Directory traversal failures at the scan root
//! - Configuration and CLI validation errors
//! - Reader thread errors
//!
//! Per-file read faults and unreadable subdirectories are not errors here:
//! the reader records them as faulted outcomes and the scanner counts them
//! as skipped directories. Only failures that must abort a run surface as
//! `BenchError`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for frio-bench
#[derive(Error, Debug)]
pub enum BenchError {
    /// Scan root could not be traversed
    #[error(transparent)]
    Traversal(#[from] TraversalError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reader thread errors
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Failures at the scan root. Always fatal, raised before any read happens.
#[derive(Error, Debug)]
pub enum TraversalError {
    /// Root path does not exist
    #[error("Root '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    /// Root path exists but is not a directory
    #[error("Root '{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// Root directory could not be listed; the cause is the error source
    #[error("Root '{}' is not readable", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid thread count
    #[error("Invalid thread count {count}: must be between 1 and {max}")]
    InvalidThreadCount { count: usize, max: usize },

    /// Glob pattern failed to compile
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Root path could not be made absolute
    #[error("Invalid root path '{}': {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },
}

/// Reader thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Reader thread could not be spawned
    #[error("Failed to spawn reader {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Reader thread panicked
    #[error("Reader {id} panicked")]
    Panicked { id: usize },
}

/// Result type alias for BenchError
pub type Result<T> = std::result::Result<T, BenchError>;
