//! 脚本化数据源
//!
//! 按 `Scenario` 时间线回放摄像头 / 头带事件，用于无设备环境的测试与演示。
//! 时间线相对于 `listen` 调用时刻，基于 tokio 定时器。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{
    BioSignal, BioSignalCallback, BioSignalSource, MonotonicClock, Scenario, StepChannel,
    VisualCallback, VisualEvent, VisualSource,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Shared replay machinery for both source kinds
struct Replay<E> {
    name: String,
    steps: Vec<(u64, E)>,
    clock: Arc<dyn MonotonicClock>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<E: Copy + Send + Sync + std::fmt::Debug + 'static> Replay<E> {
    fn new(name: &str, mut steps: Vec<(u64, E)>, clock: Arc<dyn MonotonicClock>) -> Self {
        steps.sort_by_key(|(at_ms, _)| *at_ms);
        Self {
            name: name.to_string(),
            steps,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    fn start(&self, emit: Arc<dyn Fn(i64, E) + Send + Sync>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let steps = self.steps.clone();
        let clock = Arc::clone(&self.clock);
        let running = Arc::clone(&self.running);

        let task = tokio::spawn(async move {
            let start = Instant::now();
            debug!(source = %name, steps = steps.len(), "scripted replay started");

            for (at_ms, event) in steps {
                sleep_until(start + Duration::from_millis(at_ms)).await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                trace!(source = %name, at_ms = at_ms, event = ?event, "scripted step");
                emit(clock.now_us(), event);
            }

            running.store(false, Ordering::SeqCst);
            debug!(source = %name, "scripted replay finished");
        });

        if let Ok(mut slot) = self.task.lock() {
            *slot = Some(task);
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// 脚本化摄像头源
pub struct ScriptedVisualSource {
    replay: Replay<VisualEvent>,
    capture_error: Option<String>,
}

impl ScriptedVisualSource {
    /// 创建脚本化摄像头源，`steps` 为 (毫秒偏移, 事件)
    pub fn new(name: &str, steps: Vec<(u64, VisualEvent)>, clock: Arc<dyn MonotonicClock>) -> Self {
        Self {
            replay: Replay::new(name, steps, clock),
            capture_error: None,
        }
    }

    /// 从场景中提取摄像头步骤
    pub fn from_scenario(name: &str, scenario: &Scenario, clock: Arc<dyn MonotonicClock>) -> Self {
        let steps = scenario
            .steps_for(StepChannel::Visual)
            .filter_map(|step| step.action.as_visual().map(|event| (step.at_ms, event)))
            .collect();
        let mut source = Self::new(name, steps, clock);
        source.capture_error = scenario.camera_unavailable.clone();
        source
    }

    /// 模拟摄像头不可用
    pub fn with_capture_error(mut self, reason: impl Into<String>) -> Self {
        self.capture_error = Some(reason.into());
        self
    }

    pub fn step_count(&self) -> usize {
        self.replay.steps.len()
    }
}

impl VisualSource for ScriptedVisualSource {
    fn name(&self) -> &str {
        &self.replay.name
    }

    fn capture_error(&self) -> Option<String> {
        self.capture_error.clone()
    }

    fn listen(&self, callback: VisualCallback) {
        self.replay.start(callback);
    }

    fn stop(&self) {
        self.replay.stop();
    }

    fn is_listening(&self) -> bool {
        self.replay.is_running()
    }
}

/// 脚本化头带源
pub struct ScriptedBioSource {
    replay: Replay<BioSignal>,
}

impl ScriptedBioSource {
    /// 创建脚本化头带源，`steps` 为 (毫秒偏移, 信号)
    pub fn new(name: &str, steps: Vec<(u64, BioSignal)>, clock: Arc<dyn MonotonicClock>) -> Self {
        Self {
            replay: Replay::new(name, steps, clock),
        }
    }

    /// 从场景中提取头带步骤
    pub fn from_scenario(name: &str, scenario: &Scenario, clock: Arc<dyn MonotonicClock>) -> Self {
        let steps = scenario
            .steps_for(StepChannel::Bio)
            .filter_map(|step| step.action.as_bio().map(|signal| (step.at_ms, signal)))
            .collect();
        Self::new(name, steps, clock)
    }

    pub fn step_count(&self) -> usize {
        self.replay.steps.len()
    }
}

impl BioSignalSource for ScriptedBioSource {
    fn name(&self) -> &str {
        &self.replay.name
    }

    fn listen(&self, callback: BioSignalCallback) {
        self.replay.start(callback);
    }

    fn stop(&self) {
        self.replay.stop();
    }

    fn is_listening(&self) -> bool {
        self.replay.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RuntimeClock;
    use contracts::{ArtifactEvent, QualitySample, ScenarioAction, ScenarioStep};
    use tokio::sync::mpsc;

    fn scenario() -> Scenario {
        Scenario {
            name: "test".into(),
            steps: vec![
                ScenarioStep {
                    at_ms: 0,
                    action: ScenarioAction::Face { blinking: false },
                },
                ScenarioStep {
                    at_ms: 600,
                    action: ScenarioAction::Artifact {
                        blink: true,
                        quality_good: true,
                    },
                },
                ScenarioStep {
                    at_ms: 500,
                    action: ScenarioAction::Face { blinking: true },
                },
                ScenarioStep {
                    at_ms: 700,
                    action: ScenarioAction::Quality {
                        good: true,
                        perfect: true,
                    },
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_visual_replay_in_order_and_on_time() {
        let clock: Arc<dyn MonotonicClock> = Arc::new(RuntimeClock::new());
        let source = ScriptedVisualSource::from_scenario("cam", &scenario(), clock);
        assert_eq!(source.step_count(), 2);
        assert!(source.capture_error().is_none());

        let (tx, mut rx) = mpsc::unbounded_channel();
        source.listen(Arc::new(move |at, event| {
            let _ = tx.send((at, event));
        }));
        assert!(source.is_listening());

        assert_eq!(rx.recv().await, Some((0, VisualEvent::Face { blinking: false })));
        assert_eq!(
            rx.recv().await,
            Some((500_000, VisualEvent::Face { blinking: true }))
        );
        assert_eq!(rx.recv().await, None);
        assert!(!source.is_listening());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bio_replay() {
        let clock: Arc<dyn MonotonicClock> = Arc::new(RuntimeClock::new());
        let source = ScriptedBioSource::from_scenario("band", &scenario(), clock);

        let (tx, mut rx) = mpsc::unbounded_channel();
        source.listen(Arc::new(move |at, signal| {
            let _ = tx.send((at, signal));
        }));

        assert_eq!(
            rx.recv().await,
            Some((
                600_000,
                BioSignal::Artifact(ArtifactEvent {
                    blink: true,
                    quality_good: true
                })
            ))
        );
        assert_eq!(
            rx.recv().await,
            Some((700_000, BioSignal::Quality(QualitySample::perfect())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_replay() {
        let clock: Arc<dyn MonotonicClock> = Arc::new(RuntimeClock::new());
        let source = ScriptedVisualSource::from_scenario("cam", &scenario(), clock);

        let (tx, mut rx) = mpsc::unbounded_channel();
        source.listen(Arc::new(move |at, event| {
            let _ = tx.send((at, event));
        }));
        assert!(rx.recv().await.is_some());

        source.stop();
        assert!(!source.is_listening());
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_capture_error_from_scenario() {
        let clock: Arc<dyn MonotonicClock> = Arc::new(contracts::SystemClock::new());
        let mut s = scenario();
        s.camera_unavailable = Some("permission denied".into());
        let source = ScriptedVisualSource::from_scenario("cam", &s, clock);
        assert_eq!(source.capture_error().as_deref(), Some("permission denied"));
    }
}
