//! Recorder - drives every configured sink with the same frame results

use tracing::{debug, error, info, instrument, warn};

use contracts::{
    ContractError, FrameResult, RecordFlags, RecorderConfig, ResultSink, SchemaDescriptor,
    SinkConfig, SinkType,
};

use crate::error::RecorderError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{LogSink, StreamingSink, TabularSink};

/// Any of the built-in sinks
pub enum AnySink {
    Tabular(TabularSink),
    Streaming(StreamingSink),
    Log(LogSink),
}

impl AnySink {
    pub fn as_streaming(&self) -> Option<&StreamingSink> {
        match self {
            AnySink::Streaming(sink) => Some(sink),
            _ => None,
        }
    }
}

impl From<TabularSink> for AnySink {
    fn from(sink: TabularSink) -> Self {
        AnySink::Tabular(sink)
    }
}

impl From<StreamingSink> for AnySink {
    fn from(sink: StreamingSink) -> Self {
        AnySink::Streaming(sink)
    }
}

impl From<LogSink> for AnySink {
    fn from(sink: LogSink) -> Self {
        AnySink::Log(sink)
    }
}

impl ResultSink for AnySink {
    fn name(&self) -> &str {
        match self {
            AnySink::Tabular(s) => s.name(),
            AnySink::Streaming(s) => s.name(),
            AnySink::Log(s) => s.name(),
        }
    }

    fn init(&mut self, flags: RecordFlags, schema: SchemaDescriptor) -> Result<(), ContractError> {
        match self {
            AnySink::Tabular(s) => s.init(flags, schema),
            AnySink::Streaming(s) => s.init(flags, schema),
            AnySink::Log(s) => s.init(flags, schema),
        }
    }

    async fn open(&mut self) -> Result<(), ContractError> {
        match self {
            AnySink::Tabular(s) => s.open().await,
            AnySink::Streaming(s) => s.open().await,
            AnySink::Log(s) => s.open().await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            AnySink::Tabular(s) => s.is_open(),
            AnySink::Streaming(s) => s.is_open(),
            AnySink::Log(s) => s.is_open(),
        }
    }

    async fn write(&mut self, frame: &FrameResult) -> Result<(), ContractError> {
        match self {
            AnySink::Tabular(s) => s.write(frame).await,
            AnySink::Streaming(s) => s.write(frame).await,
            AnySink::Log(s) => s.write(frame).await,
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self {
            AnySink::Tabular(s) => s.flush().await,
            AnySink::Streaming(s) => s.flush().await,
            AnySink::Log(s) => s.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            AnySink::Tabular(s) => s.close().await,
            AnySink::Streaming(s) => s.close().await,
            AnySink::Log(s) => s.close().await,
        }
    }
}

/// Create a sink from configuration
#[instrument(
    name = "recorder_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink(config: &SinkConfig) -> Result<AnySink, RecorderError> {
    let sink = match config.sink_type {
        SinkType::Log => AnySink::Log(LogSink::new(&config.name)),
        SinkType::Tabular => TabularSink::from_params(&config.name, &config.params)
            .map_err(|e| RecorderError::sink_creation(&config.name, e.to_string()))?
            .into(),
        SinkType::Streaming => StreamingSink::from_params(&config.name, &config.params)
            .map_err(|e| RecorderError::sink_creation(&config.name, e.to_string()))?
            .into(),
    };
    Ok(sink)
}

struct Registered {
    sink: AnySink,
    metrics: SinkMetrics,
}

/// Sequential fan-out over a fixed set of sinks
///
/// Every sink is initialized with the same flags and schema. Frames are
/// written to the sinks in order; a failing sink does not stop the others.
pub struct Recorder {
    sinks: Vec<Registered>,
    frames: u64,
}

impl Recorder {
    /// Initialize `sinks` with the shared flags and schema
    pub fn with_sinks(
        sinks: Vec<AnySink>,
        flags: RecordFlags,
        schema: &SchemaDescriptor,
    ) -> Result<Self, RecorderError> {
        let mut registered = Vec::with_capacity(sinks.len());
        for mut sink in sinks {
            sink.init(flags, schema.clone())?;
            registered.push(Registered {
                sink,
                metrics: SinkMetrics::new(),
            });
        }
        Ok(Self {
            sinks: registered,
            frames: 0,
        })
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Frames passed to `write`
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Look up a sink by name
    pub fn sink(&self, name: &str) -> Option<&AnySink> {
        self.sinks
            .iter()
            .map(|r| &r.sink)
            .find(|s| s.name() == name)
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sinks
            .iter()
            .map(|r| (r.sink.name().to_string(), r.metrics.snapshot()))
            .collect()
    }

    /// Open every sink. On failure the sinks opened so far are closed again.
    #[instrument(name = "recorder_open", skip(self), fields(sinks = self.sinks.len()))]
    pub async fn open(&mut self) -> Result<(), RecorderError> {
        for idx in 0..self.sinks.len() {
            if let Err(e) = self.sinks[idx].sink.open().await {
                error!(sink = %self.sinks[idx].sink.name(), error = %e, "Open failed");
                for opened in &mut self.sinks[..idx] {
                    if let Err(close_err) = opened.sink.close().await {
                        warn!(sink = %opened.sink.name(), error = %close_err, "Close after failed open");
                    }
                }
                return Err(e.into());
            }
        }
        info!(sinks = self.sinks.len(), "Recorder opened");
        Ok(())
    }

    /// Whether every sink holds its transport
    pub fn is_open(&self) -> bool {
        !self.sinks.is_empty() && self.sinks.iter().all(|r| r.sink.is_open())
    }

    /// Write one frame result to every sink
    ///
    /// Returns the first failure after every sink has been attempted.
    pub async fn write(&mut self, frame: &FrameResult) -> Result<(), RecorderError> {
        self.frames += 1;
        let mut first_error = None;

        for registered in &mut self.sinks {
            match registered.sink.write(frame).await {
                Ok(()) => registered.metrics.inc_write_count(),
                Err(e) => {
                    registered.metrics.inc_failure_count();
                    error!(
                        sink = %registered.sink.name(),
                        frame = frame.frame_number,
                        face_id = frame.face_id,
                        error = %e,
                        "Write failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if self.frames % 100 == 0 {
            debug!(frames = self.frames, "Recorder progress");
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Flush every sink
    pub async fn flush(&mut self) -> Result<(), RecorderError> {
        for registered in &mut self.sinks {
            registered.sink.flush().await?;
        }
        Ok(())
    }

    /// Close every sink. Safe to call more than once.
    ///
    /// Returns the first failure after every sink has been attempted.
    #[instrument(name = "recorder_close", skip(self))]
    pub async fn close(&mut self) -> Result<(), RecorderError> {
        let mut first_error = None;
        for registered in &mut self.sinks {
            if let Err(e) = registered.sink.close().await {
                error!(sink = %registered.sink.name(), error = %e, "Close failed");
                first_error.get_or_insert(e);
            }
        }

        info!(frames = self.frames, "Recorder closed");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Convenience function to create a recorder from configuration
#[instrument(name = "recorder_create", skip(config), fields(sinks = config.sinks.len()))]
pub fn create_recorder(config: &RecorderConfig) -> Result<Recorder, RecorderError> {
    let sinks = config
        .sinks
        .iter()
        .map(create_sink)
        .collect::<Result<Vec<_>, _>>()?;
    Recorder::with_sinks(sinks, config.flags, &config.schema)
}
