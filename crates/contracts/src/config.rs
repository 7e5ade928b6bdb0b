//! RecorderConfig - Config Loader output
//!
//! Describes what is recorded (flags + schema) and where it goes (sinks).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{RecordFlags, SchemaDescriptor};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Recorded field groups, shared by every sink
    #[serde(default)]
    pub flags: RecordFlags,

    /// Output shape, shared by every sink
    pub schema: SchemaDescriptor,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    /// Look up a parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Delimited text file, one row per record
    Tabular,
    /// TCP publish endpoint, tagged messages per record
    Streaming,
    /// Log output
    Log,
}

impl SinkType {
    /// Parameters that must be present for this sink type
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            SinkType::Tabular => &["path"],
            SinkType::Streaming => &["port"],
            SinkType::Log => &[],
        }
    }
}
