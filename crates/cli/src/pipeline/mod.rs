//! Recording session orchestration module.

mod orchestrator;
mod reader;
mod stats;

pub use orchestrator::{RecordSession, SessionConfig};
pub use reader::FrameReader;
pub use stats::RecordStats;
