//! LogSink - logs frame result summary via tracing

use contracts::{ContractError, FrameResult, RecordFlags, ResultSink, SchemaDescriptor};
use tracing::{info, instrument};

use crate::layout::Layout;

/// Sink that logs frame result summaries for debugging
pub struct LogSink {
    name: String,
    layout: Option<Layout>,
    open: bool,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: None,
            open: false,
        }
    }

    fn log_frame_summary(&self, layout: &Layout, frame: &FrameResult) {
        let groups: Vec<&str> = layout.groups().iter().map(|g| g.tag()).collect();

        info!(
            sink = %self.name,
            frame = frame.frame_number,
            face_id = frame.face_id,
            timestamp = frame.timestamp,
            success = frame.detection_success,
            confidence = frame.confidence,
            groups = ?groups,
            "FrameResult received"
        );
    }
}

impl ResultSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, flags: RecordFlags, schema: SchemaDescriptor) -> Result<(), ContractError> {
        if self.open {
            return Err(ContractError::AlreadyOpen {
                sink_name: self.name.clone(),
            });
        }
        self.layout = Some(Layout::new(flags, schema));
        Ok(())
    }

    #[instrument(name = "log_sink_open", skip(self))]
    async fn open(&mut self) -> Result<(), ContractError> {
        if self.open {
            return Err(ContractError::AlreadyOpen {
                sink_name: self.name.clone(),
            });
        }
        if self.layout.is_none() {
            return Err(ContractError::SinkNotInitialized {
                sink_name: self.name.clone(),
            });
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame = frame.frame_number)
    )]
    async fn write(&mut self, frame: &FrameResult) -> Result<(), ContractError> {
        let layout = match (&self.layout, self.open) {
            (Some(layout), true) => layout,
            _ => return Err(ContractError::sink_not_open(&self.name)),
        };
        layout.schema().check_frame(layout.flags(), frame)?;
        self.log_frame_summary(layout, frame);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if self.open {
            self.open = false;
            info!(sink = %self.name, "LogSink closed");
        }
        Ok(())
    }
}
