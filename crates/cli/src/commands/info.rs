//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RecorderConfig;
use recorder::Layout;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Output layout info for JSON output
#[derive(Serialize)]
struct LayoutInfo {
    version: String,
    mode: &'static str,
    column_count: usize,
    groups: Vec<GroupInfo>,
    sinks: Vec<SinkInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    columns: Vec<String>,
}

#[derive(Serialize)]
struct GroupInfo {
    /// Message tag on the streaming wire
    tag: &'static str,
    width: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_layout_info(&config, args.columns);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize layout info")?;
        println!("{}", json);
    } else {
        print_layout_info(&info);
    }

    Ok(())
}

fn build_layout_info(config: &RecorderConfig, with_columns: bool) -> LayoutInfo {
    let layout = Layout::new(config.flags, config.schema.clone());

    let groups = layout
        .groups()
        .into_iter()
        .map(|g| GroupInfo {
            tag: g.tag(),
            width: config.schema.group_width(g, config.flags.is_sequence),
        })
        .collect();

    let sinks = config
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            target: s.param("path").or_else(|| s.param("port")).map(str::to_string),
        })
        .collect();

    LayoutInfo {
        version: format!("{:?}", config.version),
        mode: if config.flags.is_sequence {
            "sequence"
        } else {
            "image"
        },
        column_count: config.schema.column_count(&config.flags),
        groups,
        sinks,
        columns: if with_columns {
            layout.header()
        } else {
            Vec::new()
        },
    }
}

fn print_layout_info(info: &LayoutInfo) {
    println!("=== Face Recorder Output Layout ===\n");

    println!("Record");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Mode: {}", info.mode);
    println!("   └─ Columns: {}", info.column_count);

    println!("\nGroups ({})", info.groups.len());
    for (i, group) in info.groups.iter().enumerate() {
        let prefix = if i + 1 == info.groups.len() {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {} ({} values)", prefix, group.tag, group.width);
    }

    if !info.sinks.is_empty() {
        println!("\nSinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i + 1 == info.sinks.len() {
                "└─"
            } else {
                "├─"
            };
            match &sink.target {
                Some(target) => println!("   {} {} ({}, {})", prefix, sink.name, sink.sink_type, target),
                None => println!("   {} {} ({})", prefix, sink.name, sink.sink_type),
            }
        }
    }

    if !info.columns.is_empty() {
        println!("\nColumns");
        for column in &info.columns {
            println!("   {}", column);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, RecordFlags, SchemaDescriptor};

    #[test]
    fn test_layout_info() {
        let mut flags = RecordFlags::none(false);
        flags.output_pose = true;
        flags.output_aus = true;
        let config = RecorderConfig {
            version: ConfigVersion::V1,
            flags,
            schema: SchemaDescriptor {
                au_names_reg: vec!["AU01".into()],
                au_names_class: vec!["AU01".into(), "AU45".into()],
                ..Default::default()
            },
            sinks: Vec::new(),
        };

        let info = build_layout_info(&config, true);
        assert_eq!(info.mode, "image");
        // face_id, confidence + 6 pose + 3 AU
        assert_eq!(info.column_count, 11);
        let tags: Vec<_> = info.groups.iter().map(|g| g.tag).collect();
        assert_eq!(tags, vec!["Meta", "Pose", "AUs"]);
        assert_eq!(info.columns.len(), 11);
        assert_eq!(info.columns[0], "face_id");
        assert_eq!(info.columns[8], "AU01_r");

        assert!(build_layout_info(&config, false).columns.is_empty());
    }
}
