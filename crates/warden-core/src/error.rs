//! Unified error types for Warden

use thiserror::Error;

/// Unified error type for all Warden operations
#[derive(Error, Debug)]
pub enum WardenError {
    // Pre-start errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Policy violation: {0}")]
    Policy(String),

    #[error("Capacity limit reached: {0}")]
    Capacity(String),

    // Browser engine errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Action executor failed: {0}")]
    Executor(String),

    // Session lifecycle errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid resume: {0}")]
    InvalidResume(String),

    #[error("Session timed out: {0}")]
    Timeout(String),

    #[error("Approval error: {0}")]
    Approval(String),

    // Infrastructure errors
    #[error("Storage error: {0}")]
    Storage(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using WardenError
pub type Result<T> = std::result::Result<T, WardenError>;
