//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (列名与消息格式)
//! - e2e 测试：配置 -> Recorder -> 表格文件 / TCP 订阅者

#[cfg(test)]
mod contract_tests {
    use contracts::{FieldGroup, RecordFlags, SchemaDescriptor};
    use recorder::Layout;

    #[test]
    fn test_header_snapshot() {
        let schema = SchemaDescriptor {
            num_face_landmarks: 2,
            num_model_modes: 1,
            num_eye_landmarks: 1,
            au_names_class: vec!["AU45".into()],
            au_names_reg: vec!["AU01".into()],
        };
        let layout = Layout::new(RecordFlags::all(true), schema);

        assert_eq!(
            layout.header().join(", "),
            "frame, face_id, timestamp, confidence, success, \
             gaze_0_x, gaze_0_y, gaze_0_z, gaze_1_x, gaze_1_y, gaze_1_z, gaze_angle_x, gaze_angle_y, \
             eye_lmk_x_0, eye_lmk_y_0, eye_lmk_X_0, eye_lmk_Y_0, eye_lmk_Z_0, \
             pose_Tx, pose_Ty, pose_Tz, pose_Rx, pose_Ry, pose_Rz, \
             x_0, x_1, y_0, y_1, \
             X_0, X_1, Y_0, Y_1, Z_0, Z_1, \
             p_scale, p_rx, p_ry, p_rz, p_tx, p_ty, p_0, \
             AU01_r, AU45_c"
        );
    }

    #[test]
    fn test_tags_snapshot() {
        let tags: Vec<_> = FieldGroup::ALL.iter().map(|g| g.tag()).collect();
        assert_eq!(
            tags,
            vec!["Meta", "Gaze", "Pose", "Landmarks2D", "Landmarks3D", "ModelParams", "AUs"]
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ActionUnit, FieldGroup, FrameResult, GazeEstimate, HeadPose, Point2, Point3,
        RecorderConfig, RigidParams,
    };
    use observability::RecordingStatsAggregator;
    use recorder::{create_recorder, AnySink, Recorder, StreamMessage};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpStream;
    use tokio::time::{sleep, timeout};

    const NUM_LANDMARKS: usize = 4;
    const NUM_MODES: usize = 3;
    const NUM_EYE: usize = 2;

    fn config(dir: &std::path::Path) -> RecorderConfig {
        let content = format!(
            r#"
[flags]
is_sequence = true

[schema]
num_face_landmarks = {NUM_LANDMARKS}
num_model_modes = {NUM_MODES}
num_eye_landmarks = {NUM_EYE}
au_names_reg = ["AU12", "AU01"]
au_names_class = ["AU45"]

[[sinks]]
name = "csv"
sink_type = "tabular"
[sinks.params]
path = "{path}"

[[sinks]]
name = "pub"
sink_type = "streaming"
[sinks.params]
host = "127.0.0.1"
port = "0"

[[sinks]]
name = "log"
sink_type = "log"
"#,
            path = dir.join("nested/out.csv").display()
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    fn frame(frame_number: u64) -> FrameResult {
        let n = NUM_LANDMARKS;
        FrameResult {
            face_id: 0,
            frame_number,
            timestamp: frame_number as f64 * 0.04,
            detection_success: frame_number % 5 != 4,
            confidence: 0.9,
            landmarks_2d: (0..2 * n).map(|i| i as f32 + 0.3).collect(),
            landmarks_3d: (0..3 * n).map(|i| i as f32 * 2.0).collect(),
            model_params: vec![0.5; NUM_MODES],
            rigid_params: RigidParams {
                scale: 1.0,
                ..Default::default()
            },
            head_pose: HeadPose {
                tz: 400.0,
                ..Default::default()
            },
            gaze: GazeEstimate {
                direction_0: Point3 { x: 0.0, y: 0.0, z: -1.0 },
                direction_1: Point3 { x: 0.0, y: 0.0, z: -1.0 },
                angle: [0.1, -0.2],
            },
            eye_landmarks_2d: vec![Point2 { x: 1.0, y: 2.0 }; NUM_EYE],
            eye_landmarks_3d: vec![Point3 { x: 1.0, y: 2.0, z: 3.0 }; NUM_EYE],
            au_intensities: vec![ActionUnit::new("AU12", 1.5), ActionUnit::new("AU01", 0.75)],
            au_occurrences: vec![ActionUnit::new("AU45", 1.0)],
        }
    }

    async fn subscribe(recorder: &Recorder) -> BufReader<TcpStream> {
        let sink = recorder
            .sink("pub")
            .and_then(AnySink::as_streaming)
            .unwrap();
        let stream = TcpStream::connect(sink.local_addr().unwrap()).await.unwrap();
        timeout(Duration::from_secs(5), async {
            while sink.subscriber_count() == 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        BufReader::new(stream)
    }

    async fn read_all(reader: &mut BufReader<TcpStream>) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        while reader.read_line(&mut line).await.unwrap() > 0 {
            lines.push(line.trim_end().to_string());
            line.clear();
        }
        lines
    }

    /// Config -> Recorder -> tabular file + TCP subscriber + log
    #[tokio::test]
    async fn test_e2e_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let groups = config.flags.enabled_groups().len();
        let columns = config.schema.column_count(&config.flags);

        let mut recorder = create_recorder(&config).unwrap();
        recorder.open().await.unwrap();
        let mut subscriber = subscribe(&recorder).await;

        let num_frames = 20u64;
        let mut stats = RecordingStatsAggregator::new();
        for i in 0..num_frames {
            let frame = frame(i);
            stats.update(&frame);
            recorder.write(&frame).await.unwrap();
        }
        recorder.close().await.unwrap();

        // Tabular: header + one row per frame, every row full width
        let content = std::fs::read_to_string(dir.path().join("nested/out.csv")).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows.len(), num_frames as usize + 1);
        for row in &rows {
            assert_eq!(row.split(", ").count(), columns);
        }
        assert!(rows[0].ends_with("AU12_r, AU01_r, AU45_c"));
        assert!(rows[1].starts_with("0, 0, 0.000, 0.90, 1"));
        assert!(rows[1].ends_with("1.50, 0.75, 1.0"));

        // Streaming: one message per enabled group per frame
        let lines = read_all(&mut subscriber).await;
        assert_eq!(lines.len(), num_frames as usize * groups);
        let messages: Vec<StreamMessage> = lines.iter().map(|l| l.parse().unwrap()).collect();
        for (i, chunk) in messages.chunks(groups).enumerate() {
            assert_eq!(chunk[0].group, FieldGroup::Meta);
            assert_eq!(chunk[0].get("frame"), Some(i.to_string().as_str()));
            assert_eq!(chunk[groups - 1].group, FieldGroup::ActionUnits);
        }
        // AUs on the wire are sorted by name
        assert_eq!(
            lines[groups - 1],
            "AUs:AU01_r:0.75,AU12_r:1.50,AU45_c:1.0"
        );

        // Every sink saw every frame
        for (name, snapshot) in recorder.metrics() {
            assert_eq!(snapshot.write_count, num_frames, "sink {name}");
            assert_eq!(snapshot.failure_count, 0, "sink {name}");
        }
        let published = recorder
            .sink("pub")
            .and_then(AnySink::as_streaming)
            .unwrap()
            .messages_published();
        assert_eq!(published, num_frames * groups as u64);

        let summary = stats.summary();
        assert_eq!(summary.total_frames, num_frames);
        assert_eq!(summary.failed_detections, 4);
    }

    /// A malformed frame fails every sink but the recorder keeps going
    #[tokio::test]
    async fn test_e2e_bad_frame_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut recorder = create_recorder(&config).unwrap();
        recorder.open().await.unwrap();

        recorder.write(&frame(0)).await.unwrap();
        let mut bad = frame(1);
        bad.model_params.pop();
        assert!(recorder.write(&bad).await.is_err());
        recorder.write(&frame(2)).await.unwrap();
        recorder.close().await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("nested/out.csv")).unwrap();
        assert_eq!(content.lines().count(), 3);
        for (_, snapshot) in recorder.metrics() {
            assert_eq!(snapshot.write_count, 2);
            assert_eq!(snapshot.failure_count, 1);
        }
    }

    /// Publishing without subscribers never blocks or fails
    #[tokio::test]
    async fn test_e2e_streaming_without_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut recorder = create_recorder(&config).unwrap();
        recorder.open().await.unwrap();
        timeout(Duration::from_secs(5), async {
            for i in 0..500 {
                recorder.write(&frame(i)).await.unwrap();
            }
        })
        .await
        .unwrap();
        recorder.close().await.unwrap();
    }

    /// Whatever passes validation can be built into sinks
    #[tokio::test]
    async fn test_e2e_padded_streaming_params() {
        let content = r#"
[schema]
num_face_landmarks = 0

[[sinks]]
name = "pub"
sink_type = "streaming"
[sinks.params]
host = "127.0.0.1"
port = " 0 "
channel_capacity = " 8"
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();

        let mut recorder = create_recorder(&config).unwrap();
        recorder.open().await.unwrap();
        recorder.write(&FrameResult::default()).await.unwrap();
        recorder.close().await.unwrap();
    }

    /// The caller's AU lists are untouched by streaming order
    #[tokio::test]
    async fn test_e2e_frame_not_mutated() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = create_recorder(&config(dir.path())).unwrap();
        recorder.open().await.unwrap();

        let frame = frame(0);
        recorder.write(&frame).await.unwrap();
        recorder.close().await.unwrap();

        assert_eq!(frame.au_intensities[0].name, "AU12");
        assert_eq!(frame.au_intensities[1].name, "AU01");
    }
}
