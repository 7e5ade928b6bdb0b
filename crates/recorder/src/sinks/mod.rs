//! Sink implementations
//!
//! Contains TabularSink, StreamingSink, and LogSink.

mod log;
mod publisher;
mod streaming;
mod tabular;

pub use self::log::LogSink;
pub use self::streaming::{StreamingSink, StreamingSinkConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HOST};
pub use self::tabular::{TabularSink, TabularSinkConfig, DEFAULT_DELIMITER};
