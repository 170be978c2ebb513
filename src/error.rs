//! Error handling for Ambience
//!
//! Ambient audio is best-effort: every error here is reported to the caller
//! and none of them is allowed to take down the host application.

use thiserror::Error;

use crate::engine::GraphId;

/// Result type alias for Ambience operations
pub type Result<T> = std::result::Result<T, AmbientError>;

/// Main error type for Ambience operations
#[derive(Error, Debug)]
pub enum AmbientError {
    // Context Errors
    #[error("Audio unavailable: {reason}")]
    ContextUnavailable { reason: String },

    #[error("Could not initialize audio: {reason}")]
    ContextInit { reason: String },

    #[error("Audio context is closed")]
    ContextClosed,

    // Graph Errors
    #[error("Source of graph {graph} is not playing")]
    SourceStop { graph: GraphId },

    // Configuration Errors
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl AmbientError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AmbientError::ContextUnavailable { .. } => "CONTEXT_UNAVAILABLE",
            AmbientError::ContextInit { .. } => "CONTEXT_INIT_FAILURE",
            AmbientError::ContextClosed => "CONTEXT_CLOSED",
            AmbientError::SourceStop { .. } => "SOURCE_STOP_FAILURE",
            AmbientError::InvalidConfig { .. } => "INVALID_CONFIG",
            AmbientError::Io(_) => "IO_ERROR",
            AmbientError::Serialization(_) => "SERIALIZATION_ERROR",
            AmbientError::Wav(_) => "WAV_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave playback off but a later start may succeed,
    /// e.g. after the user grants audio permission.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AmbientError::ContextInit { .. }
                | AmbientError::ContextClosed
                | AmbientError::SourceStop { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AmbientError::ContextUnavailable { .. } => vec![
                "Check that an audio output device is connected",
                "Build with the `device` feature to enable device playback",
                "Use `render` to write the ambience to a WAV file instead",
            ],
            AmbientError::ContextInit { .. } => vec![
                "Start audio from a user-initiated action",
                "Toggle ambient mode off and on again to retry",
            ],
            AmbientError::InvalidConfig { .. } => vec![
                "Run `ambience-cli config` to print a valid default configuration",
            ],
            _ => vec![],
        }
    }
}
