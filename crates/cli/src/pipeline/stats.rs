//! Recording session statistics.

use std::time::Duration;

use observability::RecordingStatsAggregator;
use recorder::MetricsSnapshot;

/// Statistics from a recording session
#[derive(Debug, Clone, Default)]
pub struct RecordStats {
    /// Frame results read from the input
    pub frames_read: u64,

    /// Total duration of the session
    pub duration: Duration,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Per-sink write counters at close
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,

    /// Messages handed to streaming subscribers
    pub messages_published: u64,

    /// Stopped by a shutdown signal before the input was exhausted
    pub interrupted: bool,

    /// Aggregated frame statistics
    pub recording: RecordingStatsAggregator,
}

impl RecordStats {
    /// Frame results per second of wall time
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_read as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Recording Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames read: {}", self.frames_read);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Messages published: {}", self.messages_published);
        println!("   └─ Interrupted: {}", self.interrupted);

        println!("\n{}", self.recording.summary());

        if !self.sink_metrics.is_empty() {
            println!("Sinks ({})", self.active_sinks);
            for (i, (name, snapshot)) in self.sink_metrics.iter().enumerate() {
                let prefix = if i + 1 == self.sink_metrics.len() {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: {} written, {} failed",
                    prefix, name, snapshot.write_count, snapshot.failure_count
                );
            }
        }
        println!();
    }
}
