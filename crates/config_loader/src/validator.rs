//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive)
//! - min_latency_us <= max_latency_us
//! - 设备眨眼等待时长覆盖整个延迟窗口
//! - sink 名称唯一，file sink 必须提供 path
//! - 回放脚本步骤时间单调不减

use std::collections::HashSet;

use contracts::{ContractError, Scenario, SinkType, SyncBlueprint};
use validator::Validate;

/// 校验 SyncBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SyncBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_latency_window(blueprint)?;
    validate_device_deadline(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验回放脚本
pub fn validate_scenario(scenario: &Scenario) -> Result<(), ContractError> {
    let mut previous = 0;
    for (idx, step) in scenario.steps.iter().enumerate() {
        if step.at_ms < previous {
            return Err(ContractError::config_validation(
                format!("steps[{idx}].at_ms"),
                format!(
                    "step times must be non-decreasing, {} comes after {}",
                    step.at_ms, previous
                ),
            ));
        }
        previous = step.at_ms;
    }
    Ok(())
}

fn validate_ranges(blueprint: &SyncBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "blueprint".to_string());
        ContractError::config_validation(field, errors.to_string())
    })
}

/// 校验延迟窗口范围
fn validate_latency_window(blueprint: &SyncBlueprint) -> Result<(), ContractError> {
    let timing = &blueprint.timing;
    if timing.min_latency_us > timing.max_latency_us {
        return Err(ContractError::config_validation(
            "timing.min_latency_us / timing.max_latency_us",
            format!(
                "min_latency_us ({}) must be <= max_latency_us ({})",
                timing.min_latency_us, timing.max_latency_us
            ),
        ));
    }
    Ok(())
}

/// 等待时长短于窗口上限时，窗口尾部永远无法被接受
fn validate_device_deadline(blueprint: &SyncBlueprint) -> Result<(), ContractError> {
    let timing = &blueprint.timing;
    let deadline_us = (timing.device_blink_deadline_ms as i64).saturating_mul(1_000);
    if deadline_us < timing.max_latency_us {
        return Err(ContractError::config_validation(
            "timing.device_blink_deadline_ms",
            format!(
                "device_blink_deadline_ms ({}) must cover max_latency_us ({})",
                timing.device_blink_deadline_ms, timing.max_latency_us
            ),
        ));
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &SyncBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::File
            && sink.params.get("path").is_none_or(|p| p.trim().is_empty())
        {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "file sink requires a 'path' param",
            ));
        }
    }
    Ok(())
}
