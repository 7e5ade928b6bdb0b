//! ResultSink trait - recorder output interface
//!
//! Defines the lifecycle every result sink follows:
//! `init` -> `open` -> `write`* -> `close`.

use crate::{ContractError, FrameResult, RecordFlags, SchemaDescriptor};

/// Frame result output trait
///
/// All sink implementations must implement this trait. Sinks own their
/// transport exclusively and are not `Clone`.
#[trait_variant::make(ResultSink: Send)]
pub trait LocalResultSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Capture the recorded groups and output schema. No I/O.
    ///
    /// # Errors
    /// Returns [`ContractError::AlreadyOpen`] when called on an open sink
    fn init(&mut self, flags: RecordFlags, schema: SchemaDescriptor) -> Result<(), ContractError>;

    /// Acquire the transport resource
    ///
    /// # Errors
    /// - [`ContractError::SinkNotInitialized`] if `init` was not called
    /// - [`ContractError::AlreadyOpen`] if the transport is already held
    /// - [`ContractError::SinkOpen`] if the resource cannot be acquired
    async fn open(&mut self) -> Result<(), ContractError>;

    /// Whether the transport resource is currently held
    fn is_open(&self) -> bool;

    /// Serialize the enabled groups of one frame result
    ///
    /// # Errors
    /// - [`ContractError::SinkNotOpen`] if called while closed
    /// - [`ContractError::CardinalityMismatch`] if the frame disagrees with the schema
    async fn write(&mut self, frame: &FrameResult) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Flush and release the transport. No-op when already closed.
    async fn close(&mut self) -> Result<(), ContractError>;
}
