//! SyncBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：时序参数、会话策略、记录器、宿主队列、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::TimingConfig;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的同步配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SyncBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 状态机时序参数
    #[serde(default)]
    #[validate(nested)]
    pub timing: TimingConfig,

    /// 超时/质量失败后的会话策略
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionPolicyConfig,

    /// EEG 记录器参数
    #[serde(default)]
    #[validate(nested)]
    pub recorder: RecorderConfig,

    /// 宿主事件队列
    #[serde(default)]
    #[validate(nested)]
    pub host: HostConfig,

    /// 输出路由配置
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// 会话升级 (escalation) 处理策略
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionPolicyConfig {
    /// 自动重试次数上限
    #[validate(range(max = 100))]
    pub max_retries: u32,

    /// 重试耗尽后的处理
    pub on_exhausted: ExhaustedAction,
}

impl Default for SessionPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            on_exhausted: ExhaustedAction::GiveUp,
        }
    }
}

/// 重试耗尽后的动作
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedAction {
    /// 以失败结束会话
    #[default]
    GiveUp,
    /// 以取消结束会话
    Cancel,
}

/// EEG 记录器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecorderConfig {
    /// 采样率 (Hz)，必须 > 0
    #[validate(range(exclusive_min = 0.0))]
    pub sample_rate_hz: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 256.0,
        }
    }
}

/// 宿主任务配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HostConfig {
    /// 事件队列容量
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink 名称
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON lines)
    File,
}

impl SyncBlueprint {
    /// Sinks to build; a blueprint without sinks logs outcomes
    pub fn effective_sinks(&self) -> Vec<SinkConfig> {
        if self.sinks.is_empty() {
            return vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                queue_capacity: default_queue_capacity(),
                params: HashMap::new(),
            }];
        }
        self.sinks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let blueprint: SyncBlueprint = toml::from_str("").unwrap();
        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert_eq!(blueprint.timing, TimingConfig::default());
        assert_eq!(blueprint.session.max_retries, 1);
        assert_eq!(blueprint.recorder.sample_rate_hz, 256.0);
        assert_eq!(blueprint.host.queue_capacity, 256);
        assert!(blueprint.validate().is_ok());

        let sinks = blueprint.effective_sinks();
        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn nested_validation_reaches_sinks() {
        let toml_str = r#"
[[sinks]]
name = ""
sink_type = "log"
"#;
        let blueprint: SyncBlueprint = toml::from_str(toml_str).unwrap();
        assert!(blueprint.validate().is_err());
    }

    #[test]
    fn nested_validation_reaches_recorder() {
        let toml_str = r#"
[recorder]
sample_rate_hz = 0.0
"#;
        let blueprint: SyncBlueprint = toml::from_str(toml_str).unwrap();
        assert!(blueprint.validate().is_err());
    }

    #[test]
    fn parses_full_document() {
        let toml_str = r#"
[timing]
min_latency_us = 40000
max_latency_us = 200000

[session]
max_retries = 3
on_exhausted = "cancel"

[[sinks]]
name = "out"
sink_type = "file"
params = { path = "/tmp/out.jsonl" }
"#;
        let blueprint: SyncBlueprint = toml::from_str(toml_str).unwrap();
        assert_eq!(blueprint.timing.min_latency_us, 40_000);
        assert_eq!(blueprint.session.on_exhausted, ExhaustedAction::Cancel);
        assert_eq!(blueprint.sinks[0].queue_capacity, 100);
        assert_eq!(
            blueprint.sinks[0].params.get("path").map(String::as_str),
            Some("/tmp/out.jsonl")
        );
    }
}
