//! `record` command implementation.

use anyhow::{Context, Result};
use contracts::{RecorderConfig, SinkType};
use tracing::{info, warn};

use crate::cli::RecordArgs;
use crate::error::CliError;
use crate::pipeline::{RecordSession, SessionConfig};

/// Execute the `record` command
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(port) = args.port {
        apply_port_override(&mut config, port);
    }

    info!(
        is_sequence = config.flags.is_sequence,
        columns = config.schema.column_count(&config.flags),
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    let session = RecordSession::new(SessionConfig {
        config,
        input: args.input.clone(),
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    let stats = session
        .run(shutdown_signal())
        .await
        .context("Recording failed")?;
    stats.print_summary();

    info!("Face Recorder finished");
    Ok(())
}

/// Point every streaming sink at `port`
fn apply_port_override(config: &mut RecorderConfig, port: u16) {
    for sink in config
        .sinks
        .iter_mut()
        .filter(|s| s.sink_type == SinkType::Streaming)
    {
        info!(sink = %sink.name, port, "Overriding streaming port from CLI");
        sink.params.insert("port".to_string(), port.to_string());
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
