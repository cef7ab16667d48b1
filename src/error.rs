//! # Error Types
//!
//! Custom error types for Anchor Watch using `thiserror`.
//!
//! Telemetry parse failures are deliberately NOT represented here: a malformed
//! field or sentence is dropped at the decoder with no channel mutation,
//! never propagated as an error.

use thiserror::Error;

/// Main error type for Anchor Watch
#[derive(Debug, Error)]
pub enum AnchorWatchError {
    /// Transport errors (serial open failure, broken connection)
    #[error("transport error: {0}")]
    Transport(String),

    /// Watch-start rejections, carrying the user-visible message
    #[error("{0}")]
    Watch(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration write-back errors
    #[error("Configuration error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Anchor Watch
pub type Result<T> = std::result::Result<T, AnchorWatchError>;
