//! Recorder 指标收集模块
//!
//! 基于 FrameResult 与 sink 写入结果收集和统计录制指标。

use std::collections::{BTreeMap, HashMap};

use contracts::FrameResult;
use metrics::{counter, gauge, histogram};

/// 从 FrameResult 记录指标
///
/// 每个进入 Recorder 的结果调用一次。
pub fn record_frame_metrics(frame: &FrameResult) {
    counter!("face_recorder_frames_total").increment(1);
    gauge!("face_recorder_last_frame_number").set(frame.frame_number as f64);

    if frame.detection_success {
        record_confidence(frame.confidence);
    } else {
        counter!("face_recorder_failed_detections_total").increment(1);
    }
}

/// 记录检测置信度
pub fn record_confidence(confidence: f64) {
    histogram!("face_recorder_confidence").record(confidence);
}

/// 记录单个 sink 的写入结果
pub fn record_frame_written(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "face_recorder_frames_written_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录流式 sink 发布的消息数
pub fn record_messages_published(sink_name: &str, count: u64) {
    counter!(
        "face_recorder_messages_published_total",
        "sink" => sink_name.to_string()
    )
    .increment(count);
}

/// 记录流式 sink 当前订阅者数
pub fn record_subscribers(sink_name: &str, subscribers: usize) {
    gauge!(
        "face_recorder_subscribers",
        "sink" => sink_name.to_string()
    )
    .set(subscribers as f64);
}

/// 录制指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RecordingStatsAggregator {
    /// 总结果数
    pub total_frames: u64,

    /// 检测失败的结果数
    pub failed_detections: u64,

    /// 写入失败次数 (任一 sink)
    pub write_failures: u64,

    /// 置信度统计 (仅成功检测)
    pub confidence_stats: RunningStats,

    /// 各 face_id 结果数
    pub face_counts: HashMap<u32, u64>,

    first_timestamp: Option<f64>,
    last_timestamp: Option<f64>,
}

impl RecordingStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, frame: &FrameResult) {
        self.total_frames += 1;
        *self.face_counts.entry(frame.face_id).or_insert(0) += 1;

        if frame.detection_success {
            self.confidence_stats.push(frame.confidence);
        } else {
            self.failed_detections += 1;
        }

        self.first_timestamp.get_or_insert(frame.timestamp);
        self.last_timestamp = Some(frame.timestamp);
    }

    /// 记录一次写入失败
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            failed_detections: self.failed_detections,
            write_failures: self.write_failures,
            failure_rate: if self.total_frames > 0 {
                self.failed_detections as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            duration_sec: match (self.first_timestamp, self.last_timestamp) {
                (Some(first), Some(last)) => (last - first).max(0.0),
                _ => 0.0,
            },
            confidence: StatsSummary::from(&self.confidence_stats),
            face_counts: self.face_counts.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub failed_detections: u64,
    pub write_failures: u64,
    pub failure_rate: f64,
    pub duration_sec: f64,
    pub confidence: StatsSummary,
    pub face_counts: BTreeMap<u32, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Recording Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Failed detections: {} ({:.2}%)",
            self.failed_detections, self.failure_rate
        )?;
        writeln!(f, "Write failures: {}", self.write_failures)?;
        writeln!(f, "Duration (s): {:.3}", self.duration_sec)?;
        writeln!(f, "Confidence: {}", self.confidence)?;

        if !self.face_counts.is_empty() {
            writeln!(f, "Results per face:")?;
            for (face_id, count) in &self.face_counts {
                writeln!(f, "  face {}: {}", face_id, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
