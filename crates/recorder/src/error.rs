//! Recorder error types

use thiserror::Error;

/// Recorder-specific errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Streaming message could not be parsed
    #[error("malformed stream message: {message}")]
    MessageParse { message: String },

    /// Sink error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a message parse error
    pub fn message_parse(message: impl Into<String>) -> Self {
        Self::MessageParse {
            message: message.into(),
        }
    }
}
