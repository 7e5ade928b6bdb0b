//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Face Recorder - write face analysis results to files and subscribers
#[derive(Parser, Debug)]
#[command(
    name = "face-recorder",
    author,
    version,
    about = "Record per-frame face analysis results",
    long_about = "Records per-frame face analysis results.\n\n\
                  Replays frame results from a JSON Lines file and writes them to the \n\
                  configured sinks: delimited tabular files and TCP streaming subscribers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FACE_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FACE_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay frame results into the configured sinks
    Record(RecordArgs),

    /// Validate configuration file without recording
    Validate(ValidateArgs),

    /// Display output layout for a configuration
    Info(InfoArgs),
}

/// Arguments for the `record` command
#[derive(Parser, Debug, Clone)]
pub struct RecordArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "recorder.toml",
        env = "FACE_RECORDER_CONFIG"
    )]
    pub config: PathBuf,

    /// Frame results to replay, one JSON object per line
    #[arg(short, long, env = "FACE_RECORDER_INPUT")]
    pub input: PathBuf,

    /// Override the port of every streaming sink
    #[arg(long, env = "FACE_RECORDER_PORT")]
    pub port: Option<u16>,

    /// Maximum number of frame results to record (0 = unlimited)
    #[arg(long, default_value = "0", env = "FACE_RECORDER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FACE_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "recorder.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "recorder.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the full tabular header
    #[arg(long)]
    pub columns: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::parse_from([
            "face-recorder",
            "-v",
            "record",
            "--config",
            "rec.toml",
            "--input",
            "frames.jsonl",
            "--port",
            "5600",
            "--max-frames",
            "10",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Record(args) => {
                assert_eq!(args.config, PathBuf::from("rec.toml"));
                assert_eq!(args.input, PathBuf::from("frames.jsonl"));
                assert_eq!(args.port, Some(5600));
                assert_eq!(args.max_frames, 10);
                assert_eq!(args.metrics_port, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["face-recorder", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
