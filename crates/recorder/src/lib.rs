//! # Recorder
//!
//! 人脸分析结果输出模块。
//!
//! 负责：
//! - 按 `RecordFlags` 与 `SchemaDescriptor` 生成列与消息布局
//! - 表格文件 sink（CSV 风格）与流式发布 sink
//! - Fan-out 到多个 sinks，单个 sink 失败不影响其他 sink

pub mod error;
pub mod format;
pub mod layout;
pub mod message;
pub mod metrics;
pub mod recorder;
pub mod sinks;

pub use contracts::{FrameResult, ResultSink};
pub use error::RecorderError;
pub use layout::{AuOrder, Layout};
pub use message::StreamMessage;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use recorder::{AnySink, Recorder, create_recorder, create_sink};
pub use sinks::{LogSink, StreamingSink, StreamingSinkConfig, TabularSink, TabularSinkConfig};
