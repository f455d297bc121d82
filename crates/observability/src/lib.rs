//! # Observability
//!
//! 眨眼同步的日志与指标出口。
//!
//! - `init_with_config`：安装 tracing 订阅器；未设置 `RUST_LOG` 时只放开本工作区
//!   各 crate 的日志级别，第三方依赖保持 `warn`
//! - `init_metrics_only`：为 `blink-sync run --metrics-port` 启动 Prometheus 端点，
//!   并登记状态机 / 采集 / 结果指标的说明
//! - `metrics`：各 crate 调用的 `record_*` 函数和内存汇总
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig::logs_only(LogFormat::Compact, "debug"))?;
//! observability::init_metrics_only(9000)?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    describe_metrics, record_artifact_verdict, record_escalation, record_event_received,
    record_outcome, record_stale_timer, record_transition, OutcomeAggregator, OutcomeSummary,
    RunningStats, StatsSummary,
};

/// Tracing targets owned by this workspace
///
/// The binary's target is `blink_sync` (bin name `blink-sync`).
pub const WORKSPACE_TARGETS: [&str; 7] = [
    "blink_sync",
    "contracts",
    "config_loader",
    "sync_engine",
    "ingestion",
    "dispatcher",
    "observability",
];

/// Level applied to every target outside the workspace
const DEPENDENCY_LEVEL: &str = "warn";

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 工作区 crate 的默认级别，`RUST_LOG` 优先
    pub workspace_level: String,
}

impl ObservabilityConfig {
    /// 仅日志，不启动 Prometheus
    pub fn logs_only(log_format: LogFormat, workspace_level: impl Into<String>) -> Self {
        Self {
            log_format,
            metrics_port: None,
            workspace_level: workspace_level.into(),
        }
    }

    /// 同时在 `port` 上导出 Prometheus 指标
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

/// Filter directives used when `RUST_LOG` is not set
///
/// `filter_directives("debug")` keeps dependencies at `warn` and opens
/// `sync_engine=debug`, `ingestion=debug` and the other workspace targets.
pub fn filter_directives(workspace_level: &str) -> String {
    let mut directives = String::from(DEPENDENCY_LEVEL);
    for target in WORKSPACE_TARGETS {
        directives.push(',');
        directives.push_str(target);
        directives.push('=');
        directives.push_str(workspace_level);
    }
    directives
}

/// 安装 tracing 订阅器，按需启动 Prometheus
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(&config.workspace_level))
            .with_context(|| format!("Invalid log level '{}'", config.workspace_level))?,
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        workspace_level = %config.workspace_level,
        "Logging initialized"
    );
    Ok(())
}

/// 启动 Prometheus 端点（tracing 已初始化时使用）
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;
    describe_metrics();

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_only_config() {
        let config = ObservabilityConfig::logs_only(LogFormat::Compact, "debug");
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.with_metrics_port(9100).metrics_port, Some(9100));
    }

    #[test]
    fn test_directives_open_workspace_targets_only() {
        let directives = filter_directives("debug");
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("sync_engine=debug"));
        assert!(directives.contains("ingestion=debug"));
        assert!(directives.contains("dispatcher=debug"));
        assert!(directives.contains("blink_sync=debug"));
        assert_eq!(directives.split(',').count(), WORKSPACE_TARGETS.len() + 1);
    }

    #[test]
    fn test_directives_parse_as_env_filter() {
        for level in ["trace", "debug", "info", "warn"] {
            assert!(EnvFilter::try_new(filter_directives(level)).is_ok(), "{level}");
        }
    }
}
