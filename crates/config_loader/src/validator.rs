//! 配置校验模块
//!
//! 校验规则：
//! - sink 字段合法 (validator derive)
//! - sink name 唯一
//! - sink 必填参数齐全 (tabular: path, streaming: port)
//! - port 为合法端口号
//! - AU 名称非空且在同一列表内唯一

use std::collections::HashSet;

use contracts::{ContractError, RecorderConfig, SinkType};
use validator::Validate;

/// 校验 RecorderConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RecorderConfig) -> Result<(), ContractError> {
    validate_sink_fields(config)?;
    validate_sink_names(config)?;
    validate_sink_params(config)?;
    validate_au_names("schema.au_names_reg", &config.schema.au_names_reg)?;
    validate_au_names("schema.au_names_class", &config.schema.au_names_class)?;
    Ok(())
}

/// 校验 sink 字段
fn validate_sink_fields(config: &RecorderConfig) -> Result<(), ContractError> {
    for (idx, sink) in config.sinks.iter().enumerate() {
        if let Err(errors) = sink.validate() {
            let message = errors
                .field_errors()
                .into_iter()
                .flat_map(|(_, errs)| errs.iter())
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ContractError::config_validation(
                format!("sinks[{idx}]"),
                message,
            ));
        }
    }
    Ok(())
}

/// 校验 sink name 唯一性
fn validate_sink_names(config: &RecorderConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &config.sinks {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

/// 校验 sink 参数
fn validate_sink_params(config: &RecorderConfig) -> Result<(), ContractError> {
    for sink in &config.sinks {
        for key in sink.sink_type.required_params() {
            let present = sink.param(key).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.{key}", sink.name),
                    format!("missing required parameter for {:?} sink", sink.sink_type),
                ));
            }
        }

        if sink.sink_type == SinkType::Streaming {
            if let Some(port) = sink.param("port") {
                port.trim().parse::<u16>().map_err(|_| {
                    ContractError::config_validation(
                        format!("sinks[{}].params.port", sink.name),
                        format!("invalid port '{port}'"),
                    )
                })?;
            }
            if let Some(capacity) = sink.param("channel_capacity") {
                match capacity.trim().parse::<usize>() {
                    Ok(n) if n > 0 && n <= usize::MAX >> 1 => {}
                    _ => {
                        return Err(ContractError::config_validation(
                            format!("sinks[{}].params.channel_capacity", sink.name),
                            format!("channel_capacity must be in 1..={}, got '{capacity}'", usize::MAX >> 1),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

/// AU 名称中不允许出现的字符 (流式消息分隔符)
const AU_NAME_FORBIDDEN: &[char] = &[',', ':', '\n', '\r'];

/// 校验 AU 名称
fn validate_au_names(field: &str, names: &[String]) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                field,
                "AU name cannot be empty",
            ));
        }
        if name.contains(AU_NAME_FORBIDDEN) {
            return Err(ContractError::config_validation(
                field,
                format!("AU name '{}' cannot contain ',', ':' or line breaks", name.escape_debug()),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ContractError::config_validation(
                field,
                format!("duplicate AU name '{name}'"),
            ));
        }
    }
    Ok(())
}
