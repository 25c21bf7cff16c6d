//! Error types for Towerline.

use thiserror::Error;

/// Top-level error type for Towerline operations.
#[derive(Debug, Error)]
pub enum TowerlineError {
    /// Invalid or unreadable match configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Combat core failed to initialize
    #[error("Initialization failed: {0}")]
    Init(String),

    /// Wire encoding/decoding errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol version mismatch
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for Towerline operations.
pub type TowerlineResult<T> = Result<T, TowerlineError>;
