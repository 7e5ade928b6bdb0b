//! `validate` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{FieldGroup, RecorderConfig, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    is_sequence: bool,
    groups: Vec<&'static str>,
    column_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    is_sequence: config.flags.is_sequence,
                    groups: config
                        .flags
                        .enabled_groups()
                        .into_iter()
                        .map(|g| g.tag())
                        .collect(),
                    column_count: config.schema.column_count(&config.flags),
                    sink_count: config.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RecorderConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let flags = &config.flags;
    let schema = &config.schema;

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - frame results will be dropped".to_string());
    }

    if flags.enabled_groups() == [FieldGroup::Meta] {
        warnings.push("Only meta columns enabled - no measurements will be recorded".to_string());
    }

    if flags.output_aus && schema.au_names_reg.is_empty() && schema.au_names_class.is_empty() {
        warnings.push("output_aus is set but the schema names no action units".to_string());
    }

    if flags.output_gaze && schema.num_eye_landmarks == 0 {
        warnings.push("output_gaze is set with num_eye_landmarks = 0".to_string());
    }

    if (flags.output_2d_landmarks || flags.output_3d_landmarks) && schema.num_face_landmarks == 0
    {
        warnings.push("Landmark output is set with num_face_landmarks = 0".to_string());
    }

    // Sinks that would fight over the same resource at open
    let mut claimed: HashMap<(SinkType, &str), &str> = HashMap::new();
    for sink in &config.sinks {
        let key = match sink.sink_type {
            SinkType::Tabular => sink.param("path"),
            SinkType::Streaming => sink.param("port").filter(|p| p.trim() != "0"),
            SinkType::Log => None,
        };
        if let Some(key) = key {
            if let Some(other) = claimed.insert((sink.sink_type, key), &sink.name) {
                warnings.push(format!(
                    "Sinks '{}' and '{}' share {:?} target '{}'",
                    other, sink.name, sink.sink_type, key
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Mode: {}",
                if summary.is_sequence {
                    "sequence"
                } else {
                    "image"
                }
            );
            println!("  Groups: {}", summary.groups.join(", "));
            println!("  Columns: {}", summary.column_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
