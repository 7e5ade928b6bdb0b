//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Frame input file not found
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    /// A line of the frame input could not be decoded
    #[error("Invalid frame result at {path}:{line}: {message}")]
    InputParse {
        path: String,
        line: u64,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn input_not_found(path: impl Into<String>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn input_parse(path: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        Self::InputParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
