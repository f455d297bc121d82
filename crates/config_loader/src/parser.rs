//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式，同时用于运行配置与回放脚本。

use contracts::ContractError;
use serde::de::DeserializeOwned;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    toml::from_str(content)
        .map_err(|e| ContractError::config_parse_with(format!("TOML parse error: {e}"), e))
}

/// 解析 JSON 格式
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    serde_json::from_str(content)
        .map_err(|e| ContractError::config_parse_with(format!("JSON parse error: {e}"), e))
}

/// 根据格式解析
pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ExhaustedAction, Scenario, ScenarioAction, SinkType, SyncBlueprint};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[timing]
max_latency_us = 200000

[session]
max_retries = 2
on_exhausted = "cancel"

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;
        let bp: SyncBlueprint = parse_toml(content).unwrap();
        assert_eq!(bp.timing.max_latency_us, 200_000);
        assert_eq!(bp.timing.min_latency_us, 50_000);
        assert_eq!(bp.session.max_retries, 2);
        assert_eq!(bp.session.on_exhausted, ExhaustedAction::Cancel);
        assert_eq!(bp.sinks.len(), 1);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "recorder": { "sample_rate_hz": 500.0 },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let bp: SyncBlueprint = parse_json(content).unwrap();
        assert_eq!(bp.recorder.sample_rate_hz, 500.0);
        assert_eq!(bp.sinks[0].queue_capacity, 100);
    }

    #[test]
    fn test_parse_scenario_toml() {
        let content = r#"
name = "quick"

[[steps]]
at_ms = 0
action = "face"
blinking = false

[[steps]]
at_ms = 120
action = "artifact"
blink = true
quality_good = true
"#;
        let scenario: Scenario = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(
            scenario.steps[1].action,
            ScenarioAction::Artifact {
                blink: true,
                quality_good: true
            }
        );
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result: Result<SyncBlueprint, _> = parse_toml("invalid toml [[[");
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
