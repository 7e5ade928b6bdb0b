//! Recording session - replays frame results through the recorder.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::RecorderConfig;
use observability::{
    record_frame_metrics, record_frame_written, record_messages_published, record_subscribers,
};
use recorder::{AnySink, MetricsSnapshot, Recorder};
use tracing::{debug, info, warn};

use super::{FrameReader, RecordStats};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated recorder configuration
    pub config: RecorderConfig,

    /// JSON Lines input of frame results
    pub input: PathBuf,

    /// Maximum number of frame results to record (None = unlimited)
    pub max_frames: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One recording run from open to close
pub struct RecordSession {
    config: SessionConfig,
}

impl RecordSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until the input is exhausted, `max_frames` is reached or `shutdown` resolves.
    ///
    /// Sinks are closed on every exit path after a successful open.
    pub async fn run<F>(self, shutdown: F) -> Result<RecordStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let config = &self.config;

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let mut reader = FrameReader::open(&config.input)
            .await
            .with_context(|| format!("Failed to open input {}", config.input.display()))?;

        let mut recorder =
            recorder::create_recorder(&config.config).context("Failed to create recorder")?;
        if recorder.is_empty() {
            warn!("No sinks configured - frame results will be dropped");
        }

        recorder.open().await.context("Failed to open sinks")?;
        for sink in &config.config.sinks {
            if let Some(addr) = recorder
                .sink(&sink.name)
                .and_then(AnySink::as_streaming)
                .and_then(|s| s.local_addr())
            {
                info!(sink = %sink.name, addr = %addr, "Streaming sink listening");
            }
        }

        let mut stats = RecordStats {
            active_sinks: recorder.len(),
            ..Default::default()
        };
        let mut counters = SinkCounters::default();

        info!(
            input = %config.input.display(),
            max_frames = ?config.max_frames,
            sinks = recorder.len(),
            "Recording started"
        );

        let replay = replay(
            &mut reader,
            &mut recorder,
            &mut stats,
            &mut counters,
            config.max_frames,
        );
        tokio::pin!(shutdown);

        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => Ok(true),
            result = replay => result.map(|_| false),
        };

        let close_result = recorder.close().await;

        stats.interrupted = match outcome {
            Ok(interrupted) => interrupted,
            Err(e) => {
                return Err(e).with_context(|| format!("Replay stopped at line {}", reader.line()));
            }
        };
        if stats.interrupted {
            warn!(frames = stats.frames_read, "Received shutdown signal, recording stopped");
        }
        close_result.context("Failed to close sinks")?;

        stats.sink_metrics = recorder.metrics();
        stats.messages_published = counters.published.values().sum();
        stats.duration = start_time.elapsed();

        info!(
            frames = stats.frames_read,
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Recording complete"
        );

        Ok(stats)
    }
}

async fn replay(
    reader: &mut FrameReader,
    recorder: &mut Recorder,
    stats: &mut RecordStats,
    counters: &mut SinkCounters,
    max_frames: Option<u64>,
) -> Result<()> {
    while let Some(frame) = reader.next_frame().await? {
        stats.frames_read += 1;
        record_frame_metrics(&frame);
        stats.recording.update(&frame);

        if let Err(e) = recorder.write(&frame).await {
            // already logged per sink; the remaining frames are still recorded
            debug!(frame = frame.frame_number, error = %e, "Frame not recorded by every sink");
            stats.recording.record_write_failure();
        }
        counters.update(recorder);

        if let Some(max) = max_frames {
            if stats.frames_read >= max {
                info!(frames = stats.frames_read, "Reached max frames limit");
                break;
            }
        }
    }
    Ok(())
}

/// Forwards per-sink counter deltas to the metrics recorder
#[derive(Default)]
struct SinkCounters {
    written: HashMap<String, MetricsSnapshot>,
    published: HashMap<String, u64>,
}

impl SinkCounters {
    fn update(&mut self, recorder: &Recorder) {
        for (name, snapshot) in recorder.metrics() {
            let previous = self.written.insert(name.clone(), snapshot).unwrap_or_default();
            if snapshot.write_count > previous.write_count {
                record_frame_written(&name, true);
            }
            if snapshot.failure_count > previous.failure_count {
                record_frame_written(&name, false);
            }

            if let Some(streaming) = recorder.sink(&name).and_then(AnySink::as_streaming) {
                let published = streaming.messages_published();
                let previous = self.published.insert(name.clone(), published).unwrap_or(0);
                if published > previous {
                    record_messages_published(&name, published - previous);
                }
                record_subscribers(&name, streaming.subscriber_count());
            }
        }
    }
}
