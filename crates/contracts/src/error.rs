//! Layered error definitions
//!
//! Categorized by source: config / sink lifecycle / frame contract / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Lifecycle Errors =====
    /// `open` was called before `init`
    #[error("sink '{sink_name}' opened before init")]
    SinkNotInitialized { sink_name: String },

    /// Transport resource could not be acquired
    #[error("sink '{sink_name}' open error: {message}")]
    SinkOpen { sink_name: String, message: String },

    /// `open` or `init` on a sink that already holds its transport
    #[error("sink '{sink_name}' is already open")]
    AlreadyOpen { sink_name: String },

    /// `write` on a sink that does not hold its transport
    #[error("sink '{sink_name}' is not open")]
    SinkNotOpen { sink_name: String },

    // ===== Frame Contract Errors =====
    /// Frame field length disagrees with the schema fixed at init
    #[error("cardinality mismatch for '{field}': expected {expected}, got {actual}")]
    CardinalityMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink open error
    pub fn sink_open(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkOpen {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink-not-open error
    pub fn sink_not_open(sink_name: impl Into<String>) -> Self {
        Self::SinkNotOpen {
            sink_name: sink_name.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create cardinality mismatch error
    pub fn cardinality(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::CardinalityMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }
}
