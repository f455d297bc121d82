//! Blink sync 指标收集模块
//!
//! 记录状态机迁移、伪迹判定、会话结果，并在内存中聚合统计摘要。

use std::collections::HashMap;

use contracts::{Escalation, SessionOutcome, SyncState};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 登记指标说明，Prometheus 导出时作为 HELP 文本
pub fn describe_metrics() {
    describe_counter!(
        "blink_sync_transitions_total",
        "State machine transitions by from/to state"
    );
    describe_gauge!(
        "blink_sync_processing",
        "1 while the active state processes visual/bio events"
    );
    describe_counter!("blink_sync_events_total", "Events handled by the engine");
    describe_counter!(
        "blink_sync_artifact_verdicts_total",
        "Blink artifacts classified against the latency window"
    );
    describe_histogram!(
        "blink_sync_artifact_delta_ms",
        Unit::Milliseconds,
        "Artifact minus visual blink time for every classified artifact"
    );
    describe_counter!(
        "blink_sync_stale_timers_total",
        "Timer firings ignored because they were superseded"
    );
    describe_counter!(
        "blink_sync_escalations_total",
        "Sessions parked on a retry / give-up decision"
    );
    describe_counter!("blink_sync_sessions_total", "Closed sessions by outcome");
    describe_histogram!(
        "blink_sync_latency_ms",
        Unit::Milliseconds,
        "Headband latency of accepted matches"
    );
    describe_gauge!(
        "blink_sync_last_sample_index",
        "EEG sample index stamped by the last accepted match"
    );
    describe_counter!(
        "blink_sync_ingestion_reports_total",
        "Source reports marshalled into the host queue"
    );
    describe_counter!(
        "blink_sync_ingestion_dropped_total",
        "Source reports dropped on a full host queue"
    );
}

/// 记录状态迁移
pub fn record_transition(from: SyncState, to: SyncState) {
    counter!(
        "blink_sync_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("blink_sync_processing").set(if to.is_processing() { 1.0 } else { 0.0 });
}

/// 记录状态机收到的事件
pub fn record_event_received(event: &'static str) {
    counter!("blink_sync_events_total", "event" => event).increment(1);
}

/// 记录伪迹判定结果 (accepted / too_early / too_late)
pub fn record_artifact_verdict(verdict: &'static str, delta_us: i64) {
    counter!("blink_sync_artifact_verdicts_total", "verdict" => verdict).increment(1);
    histogram!("blink_sync_artifact_delta_ms").record(delta_us as f64 / 1000.0);
}

/// 记录过期定时器 (已被取代或会话已关闭)
pub fn record_stale_timer(kind: &'static str) {
    counter!("blink_sync_stale_timers_total", "kind" => kind).increment(1);
}

/// 记录会话升级
pub fn record_escalation(escalation: &Escalation) {
    counter!(
        "blink_sync_escalations_total",
        "failure" => escalation.failure.as_str()
    )
    .increment(1);
}

/// 记录会话最终结果
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_outcome;
///
/// while let Some(outcome) = outcomes.recv().await {
///     record_outcome(&outcome);
/// }
/// ```
pub fn record_outcome(outcome: &SessionOutcome) {
    counter!(
        "blink_sync_sessions_total",
        "outcome" => outcome.outcome.label()
    )
    .increment(1);

    if let Some(m) = outcome.outcome.blink_match() {
        histogram!("blink_sync_latency_ms").record(m.latency_us as f64 / 1000.0);
        gauge!("blink_sync_last_sample_index").set(m.sample_index as f64);
    }

    let counters = &outcome.counters;
    histogram!("blink_sync_session_visual_blinks").record(counters.visual_blinks as f64);
    histogram!("blink_sync_session_bio_blinks").record(counters.bio_blinks as f64);
}

/// 会话结果聚合器
///
/// 在内存中聚合结果，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct OutcomeAggregator {
    /// 会话总数
    pub total_sessions: u64,

    /// 成功匹配数
    pub accepted: u64,

    /// 取消数
    pub cancelled: u64,

    /// 各失败原因计数
    pub failures: HashMap<&'static str, u64>,

    /// 升级次数
    pub escalations: u64,

    /// 视觉眨眼总数
    pub visual_blinks: u64,

    /// 设备眨眼总数
    pub bio_blinks: u64,

    /// 过早到达的伪迹
    pub bio_too_early: u64,

    /// 过晚到达的伪迹
    pub bio_too_late: u64,

    /// 延迟统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl OutcomeAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, outcome: &SessionOutcome) {
        self.total_sessions += 1;

        if outcome.outcome.is_cancelled() {
            self.cancelled += 1;
        }
        if let Some(m) = outcome.outcome.blink_match() {
            self.accepted += 1;
            self.latency_stats.push(m.latency_us as f64 / 1000.0);
        }
        if let Some(failure) = outcome.outcome.failure() {
            *self.failures.entry(failure.as_str()).or_insert(0) += 1;
        }

        let counters = &outcome.counters;
        self.visual_blinks += counters.visual_blinks;
        self.bio_blinks += counters.bio_blinks;
        self.bio_too_early += counters.bio_too_early;
        self.bio_too_late += counters.bio_too_late;
    }

    /// 统计一次升级
    pub fn record_escalation(&mut self, _escalation: &Escalation) {
        self.escalations += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> OutcomeSummary {
        let failed = self.failures.values().sum();
        OutcomeSummary {
            total_sessions: self.total_sessions,
            accepted: self.accepted,
            failed,
            cancelled: self.cancelled,
            escalations: self.escalations,
            acceptance_rate: if self.total_sessions > 0 {
                self.accepted as f64 / self.total_sessions as f64 * 100.0
            } else {
                0.0
            },
            visual_blinks: self.visual_blinks,
            bio_blinks: self.bio_blinks,
            bio_too_early: self.bio_too_early,
            bio_too_late: self.bio_too_late,
            latency_ms: StatsSummary::from(&self.latency_stats),
            failure_counts: self.failures.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 结果摘要
#[derive(Debug, Clone, Default)]
pub struct OutcomeSummary {
    pub total_sessions: u64,
    pub accepted: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub escalations: u64,
    pub acceptance_rate: f64,
    pub visual_blinks: u64,
    pub bio_blinks: u64,
    pub bio_too_early: u64,
    pub bio_too_late: u64,
    pub latency_ms: StatsSummary,
    pub failure_counts: HashMap<&'static str, u64>,
}

impl std::fmt::Display for OutcomeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Blink Sync Summary ===")?;
        writeln!(f, "Sessions: {}", self.total_sessions)?;
        writeln!(
            f,
            "Accepted: {} ({:.2}%)",
            self.accepted, self.acceptance_rate
        )?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Cancelled: {}", self.cancelled)?;
        writeln!(f, "Escalations: {}", self.escalations)?;
        writeln!(
            f,
            "Blinks: visual={} bio={} too_early={} too_late={}",
            self.visual_blinks, self.bio_blinks, self.bio_too_early, self.bio_too_late
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.failure_counts.is_empty() {
            writeln!(f, "Failure reasons:")?;
            for (reason, count) in &self.failure_counts {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
