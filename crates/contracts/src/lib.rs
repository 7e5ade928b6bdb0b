//! # Contracts
//!
//! Frozen interface contracts shared by every recorder crate: the per-frame
//! measurement model, the output schema, the sink trait and the error type.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Frame model
//! - One `FrameResult` per analyzed face per frame
//! - `frame_number` and `timestamp` are only meaningful in sequence mode

mod config;
mod error;
mod frame;
mod schema;
mod sink;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use schema::*;
pub use sink::*;
