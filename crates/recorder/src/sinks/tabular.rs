//! TabularSink - writes one delimited row per frame result

use contracts::{ContractError, FrameResult, RecordFlags, ResultSink, SchemaDescriptor};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};

use crate::layout::Layout;

/// Column separator used when none is configured
pub const DEFAULT_DELIMITER: &str = ", ";

/// Configuration for TabularSink
#[derive(Debug, Clone)]
pub struct TabularSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Column separator
    pub delimiter: String,
}

impl TabularSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        let delimiter = match params.get("delimiter") {
            Some(d) if d.is_empty() => return Err("'delimiter' cannot be empty".to_string()),
            Some(d) => d.clone(),
            None => DEFAULT_DELIMITER.to_string(),
        };

        Ok(Self { path, delimiter })
    }
}

/// Sink that appends frame results to a delimited text file
pub struct TabularSink {
    name: String,
    config: TabularSinkConfig,
    layout: Option<Layout>,
    writer: Option<BufWriter<File>>,
    rows_written: u64,
}

impl TabularSink {
    /// Create a new TabularSink. The file is created on `open`.
    pub fn new(name: impl Into<String>, config: TabularSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
            layout: None,
            writer: None,
            rows_written: 0,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = TabularSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks[{name}].params"), e))?;
        Ok(Self::new(name, config))
    }

    /// Output file path
    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    /// Data rows written since the last `open`
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn create_file(&self, layout: &Layout) -> std::io::Result<BufWriter<File>> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.config.path)?);
        writeln!(writer, "{}", layout.header().join(&self.config.delimiter))?;
        Ok(writer)
    }

    fn append_row(&mut self, frame: &FrameResult) -> Result<(), ContractError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ContractError::sink_not_open(&self.name))?;
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| ContractError::sink_not_open(&self.name))?;

        let row = layout.row(frame)?;
        writeln!(writer, "{}", row.join(&self.config.delimiter)).map_err(|e| {
            error!(sink = %self.name, frame = frame.frame_number, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })?;

        self.rows_written += 1;
        Ok(())
    }
}

impl ResultSink for TabularSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, flags: RecordFlags, schema: SchemaDescriptor) -> Result<(), ContractError> {
        if self.is_open() {
            return Err(ContractError::AlreadyOpen {
                sink_name: self.name.clone(),
            });
        }
        self.layout = Some(Layout::new(flags, schema));
        Ok(())
    }

    #[instrument(
        name = "tabular_sink_open",
        skip(self),
        fields(sink = %self.name, path = %self.config.path.display())
    )]
    async fn open(&mut self) -> Result<(), ContractError> {
        if self.is_open() {
            return Err(ContractError::AlreadyOpen {
                sink_name: self.name.clone(),
            });
        }
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| ContractError::SinkNotInitialized {
                sink_name: self.name.clone(),
            })?;

        let writer = self.create_file(layout).map_err(|e| {
            error!(sink = %self.name, error = %e, "Cannot create output file");
            ContractError::sink_open(&self.name, e.to_string())
        })?;

        info!(
            sink = %self.name,
            columns = layout.schema().column_count(layout.flags()),
            "TabularSink opened"
        );
        self.writer = Some(writer);
        self.rows_written = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    #[instrument(
        name = "tabular_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame = frame.frame_number, face_id = frame.face_id)
    )]
    async fn write(&mut self, frame: &FrameResult) -> Result<(), ContractError> {
        self.append_row(frame)
    }

    #[instrument(name = "tabular_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "tabular_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
            debug!(sink = %self.name, rows = self.rows_written, "TabularSink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ActionUnit;
    use tempfile::tempdir;

    fn landmarks_only(count: usize) -> (RecordFlags, SchemaDescriptor) {
        let mut flags = RecordFlags::none(true);
        flags.output_2d_landmarks = true;
        let schema = SchemaDescriptor {
            num_face_landmarks: count,
            ..Default::default()
        };
        (flags, schema)
    }

    fn frame(frame_number: u64, count: usize) -> FrameResult {
        FrameResult {
            frame_number,
            timestamp: frame_number as f64 / 30.0,
            detection_success: true,
            confidence: 0.9,
            landmarks_2d: (0..2 * count).map(|i| i as f32 + 0.3).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tabular_sink_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let (flags, schema) = landmarks_only(5);

        let mut sink = TabularSink::new("test_csv", TabularSinkConfig::new(&path));
        sink.init(flags, schema).unwrap();
        sink.open().await.unwrap();
        assert!(sink.is_open());

        for i in 0..3 {
            sink.write(&frame(i, 5)).await.unwrap();
        }
        sink.close().await.unwrap();
        assert!(!sink.is_open());

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "frame, face_id, timestamp, confidence, success, \
             x_0, x_1, x_2, x_3, x_4, y_0, y_1, y_2, y_3, y_4"
        );
        assert_eq!(
            lines[2],
            "1, 0, 0.033, 0.90, 1, 0.3, 1.3, 2.3, 3.3, 4.3, 5.3, 6.3, 7.3, 8.3, 9.3"
        );
        for line in &lines {
            assert_eq!(line.split(", ").count(), 15);
        }
    }

    #[tokio::test]
    async fn test_write_before_open_fails() {
        let dir = tempdir().unwrap();
        let (flags, schema) = landmarks_only(1);
        let mut sink = TabularSink::new("csv", TabularSinkConfig::new(dir.path().join("a.csv")));
        sink.init(flags, schema).unwrap();

        let err = sink.write(&frame(0, 1)).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkNotOpen { .. }));
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let (flags, schema) = landmarks_only(1);
        let mut sink = TabularSink::new("csv", TabularSinkConfig::new(dir.path().join("a.csv")));
        sink.init(flags, schema).unwrap();
        sink.open().await.unwrap();
        sink.close().await.unwrap();
        // closing twice is a no-op
        sink.close().await.unwrap();

        let err = sink.write(&frame(0, 1)).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkNotOpen { .. }));
    }

    #[tokio::test]
    async fn test_open_requires_init() {
        let dir = tempdir().unwrap();
        let mut sink = TabularSink::new("csv", TabularSinkConfig::new(dir.path().join("a.csv")));
        let err = sink.open().await.unwrap_err();
        assert!(matches!(err, ContractError::SinkNotInitialized { .. }));
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_open_twice_rejected() {
        let dir = tempdir().unwrap();
        let (flags, schema) = landmarks_only(1);
        let mut sink = TabularSink::new("csv", TabularSinkConfig::new(dir.path().join("a.csv")));
        sink.init(flags, schema.clone()).unwrap();
        sink.open().await.unwrap();

        assert!(matches!(
            sink.open().await.unwrap_err(),
            ContractError::AlreadyOpen { .. }
        ));
        assert!(matches!(
            sink.init(flags, schema).unwrap_err(),
            ContractError::AlreadyOpen { .. }
        ));
    }

    #[tokio::test]
    async fn test_open_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let (flags, schema) = landmarks_only(1);
        // the path is an existing directory
        let mut sink = TabularSink::new("csv", TabularSinkConfig::new(dir.path()));
        sink.init(flags, schema).unwrap();

        let err = sink.open().await.unwrap_err();
        assert!(matches!(err, ContractError::SinkOpen { .. }));
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_cardinality_mismatch_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let (flags, schema) = landmarks_only(5);
        let mut sink = TabularSink::new("csv", TabularSinkConfig::new(&path));
        sink.init(flags, schema).unwrap();
        sink.open().await.unwrap();

        let err = sink.write(&frame(0, 4)).await.unwrap_err();
        assert!(matches!(err, ContractError::CardinalityMismatch { .. }));
        assert_eq!(sink.rows_written(), 0);
        sink.close().await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_action_units_in_schema_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aus.tsv");
        let mut flags = RecordFlags::none(false);
        flags.output_aus = true;
        let schema = SchemaDescriptor {
            au_names_reg: vec!["AU45".into(), "AU04".into()],
            au_names_class: vec!["AU28".into()],
            ..Default::default()
        };

        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        params.insert("delimiter".to_string(), "\t".to_string());
        let mut sink = TabularSink::from_params("tsv", &params).unwrap();
        sink.init(flags, schema).unwrap();
        sink.open().await.unwrap();

        let f = FrameResult {
            face_id: 2,
            confidence: 0.5,
            au_intensities: vec![ActionUnit::new("AU04", 2.346), ActionUnit::new("AU45", 0.0)],
            au_occurrences: vec![ActionUnit::new("AU28", 1.0)],
            ..Default::default()
        };
        sink.write(&f).await.unwrap();
        // no AU output for this face: zeros
        sink.write(&FrameResult::default()).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "face_id\tconfidence\tAU45_r\tAU04_r\tAU28_c");
        assert_eq!(lines[1], "2\t0.500\t0.00\t2.35\t1.0");
        assert_eq!(lines[2], "0\t0.000\t0.00\t0.00\t0.0");
    }

    #[test]
    fn test_config_requires_path() {
        let params = HashMap::new();
        assert!(TabularSinkConfig::from_params(&params).is_err());
    }
}
