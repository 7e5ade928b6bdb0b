//! StreamingSink - publishes tagged messages per frame result over TCP

use bytes::Bytes;
use contracts::{ContractError, FrameResult, RecordFlags, ResultSink, SchemaDescriptor};
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{debug, error, info, instrument, trace};

use super::publisher::{Publisher, MAX_CAPACITY};
use crate::layout::Layout;

/// Host bound when none is configured (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Per-subscriber backlog when none is configured
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for StreamingSink
#[derive(Debug, Clone)]
pub struct StreamingSinkConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind (0 = ephemeral)
    pub port: u16,
    /// Messages buffered per subscriber before the oldest are dropped
    pub channel_capacity: usize,
}

impl StreamingSinkConfig {
    pub fn new(port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let port_str = params
            .get("port")
            .ok_or_else(|| "missing 'port' parameter".to_string())?;

        let port: u16 = port_str
            .trim()
            .parse()
            .map_err(|e| format!("invalid port '{}': {}", port_str, e))?;

        let host = params
            .get("host")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let channel_capacity = match params.get("channel_capacity") {
            Some(s) => match s.trim().parse::<usize>() {
                Ok(0) => return Err("'channel_capacity' must be > 0".to_string()),
                Ok(n) if n > MAX_CAPACITY => {
                    return Err(format!("'channel_capacity' must be <= {MAX_CAPACITY}"));
                }
                Ok(n) => n,
                Err(e) => return Err(format!("invalid channel_capacity '{}': {}", s, e)),
            },
            None => DEFAULT_CHANNEL_CAPACITY,
        };

        Ok(Self {
            host,
            port,
            channel_capacity,
        })
    }
}

/// Sink that publishes one message per enabled field group
pub struct StreamingSink {
    name: String,
    config: StreamingSinkConfig,
    layout: Option<Layout>,
    publisher: Option<Publisher>,
    messages_published: u64,
}

impl StreamingSink {
    /// Create a new StreamingSink. The port is bound on `open`.
    pub fn new(name: impl Into<String>, config: StreamingSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
            layout: None,
            publisher: None,
            messages_published: 0,
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = StreamingSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks[{name}].params"), e))?;
        Ok(Self::new(name, config))
    }

    /// Bound address while open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.publisher.as_ref().map(Publisher::local_addr)
    }

    /// Currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.publisher
            .as_ref()
            .map_or(0, Publisher::subscriber_count)
    }

    /// Messages published since the last `open`
    pub fn messages_published(&self) -> u64 {
        self.messages_published
    }

    fn publisher(&self) -> Result<&Publisher, ContractError> {
        self.publisher
            .as_ref()
            .ok_or_else(|| ContractError::sink_not_open(&self.name))
    }
}

impl ResultSink for StreamingSink {
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
        name = "streaming_sink_open",
        skip(self),
        fields(sink = %self.name, port = self.config.port)
    )]
    async fn open(&mut self) -> Result<(), ContractError> {
        if self.is_open() {
            return Err(ContractError::AlreadyOpen {
                sink_name: self.name.clone(),
            });
        }
        if self.layout.is_none() {
            return Err(ContractError::SinkNotInitialized {
                sink_name: self.name.clone(),
            });
        }

        let capacity = self.config.channel_capacity;
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(ContractError::sink_open(
                &self.name,
                format!("channel_capacity must be in 1..={MAX_CAPACITY}, got {capacity}"),
            ));
        }

        let publisher = Publisher::bind(
            &self.name,
            &self.config.host,
            self.config.port,
            self.config.channel_capacity,
        )
        .await
        .map_err(|e| {
            error!(sink = %self.name, error = %e, "Cannot bind publish endpoint");
            ContractError::sink_open(
                &self.name,
                format!("{}:{}: {}", self.config.host, self.config.port, e),
            )
        })?;

        info!(sink = %self.name, addr = %publisher.local_addr(), "StreamingSink opened");
        self.publisher = Some(publisher);
        self.messages_published = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.publisher.is_some()
    }

    #[instrument(
        name = "streaming_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame = frame.frame_number, face_id = frame.face_id)
    )]
    async fn write(&mut self, frame: &FrameResult) -> Result<(), ContractError> {
        let publisher = self.publisher()?;
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| ContractError::sink_not_open(&self.name))?;

        let messages = layout.messages(frame)?;
        let count = messages.len();
        for message in messages {
            let receivers = publisher.publish(Bytes::from(format!("{message}\n")));
            trace!(sink = %self.name, tag = message.tag(), receivers, "Published");
        }

        self.messages_published += count as u64;
        Ok(())
    }

    #[instrument(name = "streaming_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Messages are handed to subscribers on publish
        Ok(())
    }

    #[instrument(name = "streaming_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut publisher) = self.publisher.take() {
            publisher.shutdown().await;
            debug!(
                sink = %self.name,
                messages = self.messages_published,
                "StreamingSink closed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StreamMessage;
    use contracts::{FieldGroup, GazeEstimate, HeadPose, Point3};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpStream;
    use tokio::time::{sleep, timeout};

    fn local_config() -> StreamingSinkConfig {
        StreamingSinkConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            channel_capacity: 64,
        }
    }

    fn gaze_and_pose() -> RecordFlags {
        let mut flags = RecordFlags::none(true);
        flags.output_gaze = true;
        flags.output_pose = true;
        flags
    }

    fn frame(frame_number: u64) -> FrameResult {
        FrameResult {
            frame_number,
            timestamp: 1.5,
            detection_success: true,
            confidence: 0.98,
            head_pose: HeadPose {
                tx: 12.34,
                ty: -8.0,
                tz: 512.0,
                rx: 0.25,
                ry: -0.125,
                rz: 0.0,
            },
            gaze: GazeEstimate {
                direction_0: Point3 {
                    x: 0.0,
                    y: 0.0,
                    z: -1.0,
                },
                direction_1: Point3 {
                    x: 0.0,
                    y: 0.0,
                    z: -1.0,
                },
                angle: [0.0, 0.0],
            },
            ..Default::default()
        }
    }

    async fn open_sink(flags: RecordFlags) -> StreamingSink {
        let mut sink = StreamingSink::new("test_pub", local_config());
        sink.init(flags, SchemaDescriptor::default()).unwrap();
        sink.open().await.unwrap();
        sink
    }

    async fn subscribe(sink: &StreamingSink) -> BufReader<TcpStream> {
        let addr = sink.local_addr().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();
        timeout(Duration::from_secs(5), async {
            while sink.subscriber_count() == 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        BufReader::new(stream)
    }

    #[tokio::test]
    async fn test_gaze_and_pose_emit_three_messages() {
        let mut sink = open_sink(gaze_and_pose()).await;
        let mut reader = subscribe(&sink).await;

        sink.write(&frame(7)).await.unwrap();
        sink.close().await.unwrap();

        let mut lines = Vec::new();
        let mut line = String::new();
        while reader.read_line(&mut line).await.unwrap() > 0 {
            lines.push(line.trim_end().to_string());
            line.clear();
        }

        assert_eq!(lines.len(), 3);
        let messages: Vec<StreamMessage> = lines.iter().map(|l| l.parse().unwrap()).collect();
        let groups: Vec<FieldGroup> = messages.iter().map(|m| m.group).collect();
        assert_eq!(
            groups,
            vec![FieldGroup::Meta, FieldGroup::Gaze, FieldGroup::Pose]
        );

        assert_eq!(
            lines[0],
            "Meta:frame:7,face_id:0,timestamp:1.500,confidence:0.98,success:1"
        );
        assert_eq!(
            lines[2],
            "Pose:pose_Tx:12.3,pose_Ty:-8.0,pose_Tz:512.0,pose_Rx:0.250,pose_Ry:-0.125,pose_Rz:0.000"
        );
        assert_eq!(messages[1].get("gaze_0_z"), Some("-1.000000"));
        assert_eq!(messages[1].get("gaze_angle_y"), Some("0.000"));
    }

    #[tokio::test]
    async fn test_message_count_per_frame() {
        let mut sink = open_sink(gaze_and_pose()).await;
        for i in 0..4 {
            sink.write(&frame(i)).await.unwrap();
        }
        // no subscriber: published and discarded
        assert_eq!(sink.messages_published(), 12);
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_before_open_fails() {
        let mut sink = StreamingSink::new("test_pub", local_config());
        sink.init(gaze_and_pose(), SchemaDescriptor::default()).unwrap();

        let err = sink.write(&frame(0)).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkNotOpen { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut sink = open_sink(gaze_and_pose()).await;
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert!(!sink.is_open());
        assert!(sink.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_open_fails_when_port_taken() {
        let first = open_sink(gaze_and_pose()).await;
        let port = first.local_addr().unwrap().port();

        let mut config = local_config();
        config.port = port;
        let mut second = StreamingSink::new("second", config);
        second.init(gaze_and_pose(), SchemaDescriptor::default()).unwrap();

        let err = second.open().await.unwrap_err();
        assert!(matches!(err, ContractError::SinkOpen { .. }));
        assert!(!second.is_open());
    }

    #[tokio::test]
    async fn test_cardinality_mismatch_publishes_nothing() {
        let mut flags = RecordFlags::none(true);
        flags.output_3d_landmarks = true;
        let mut sink = StreamingSink::new("test_pub", local_config());
        sink.init(
            flags,
            SchemaDescriptor {
                num_face_landmarks: 3,
                ..Default::default()
            },
        )
        .unwrap();
        sink.open().await.unwrap();

        let err = sink.write(&frame(0)).await.unwrap_err();
        assert!(matches!(err, ContractError::CardinalityMismatch { .. }));
        assert_eq!(sink.messages_published(), 0);
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_rejects_zero_capacity() {
        let mut config = local_config();
        config.channel_capacity = 0;
        let mut sink = StreamingSink::new("test_pub", config);
        sink.init(gaze_and_pose(), SchemaDescriptor::default()).unwrap();

        let err = sink.open().await.unwrap_err();
        assert!(matches!(err, ContractError::SinkOpen { .. }));
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_close_returns_with_stalled_subscriber() {
        const LANDMARKS: usize = 5000;
        let mut flags = RecordFlags::none(true);
        flags.output_2d_landmarks = true;

        let mut config = local_config();
        config.channel_capacity = 1024;
        let mut sink = StreamingSink::new("test_pub", config);
        sink.init(
            flags,
            SchemaDescriptor {
                num_face_landmarks: LANDMARKS,
                ..Default::default()
            },
        )
        .unwrap();
        sink.open().await.unwrap();

        // connected but never reads
        let stalled = subscribe(&sink).await;

        let mut big = frame(0);
        big.landmarks_2d = (0..2 * LANDMARKS).map(|i| i as f32 + 0.5).collect();
        for i in 0..250 {
            big.frame_number = i;
            sink.write(&big).await.unwrap();
        }

        let closed = timeout(Duration::from_secs(10), sink.close()).await;
        assert!(closed.is_ok(), "close blocked on a stalled subscriber");
        assert!(closed.unwrap().is_ok());
        assert!(!sink.is_open());
        drop(stalled);
    }

    #[test]
    fn test_config_parsing() {
        let mut params = HashMap::new();
        params.insert("port".to_string(), "5000".to_string());
        let config = StreamingSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);

        params.insert("port".to_string(), "not-a-port".to_string());
        assert!(StreamingSinkConfig::from_params(&params).is_err());

        params.insert("port".to_string(), "5000".to_string());
        params.insert("channel_capacity".to_string(), "0".to_string());
        assert!(StreamingSinkConfig::from_params(&params).is_err());
    }

    #[test]
    fn test_config_parsing_trims_numbers() {
        let mut params = HashMap::new();
        params.insert("port".to_string(), " 5000 ".to_string());
        params.insert("channel_capacity".to_string(), " 16".to_string());
        let config = StreamingSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.channel_capacity, 16);
    }
}
