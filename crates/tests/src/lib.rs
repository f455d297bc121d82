//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 脚本化 e2e 测试（无需摄像头与头带）
//!
//! 所有 e2e 测试运行在暂停的 tokio 时钟上，定时器按虚拟时间推进。

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, Outcome, SessionFailure, SyncState};

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
        assert_eq!(SyncState::default(), SyncState::Idle);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let json = serde_json::to_value(Outcome::Failed {
            failure: SessionFailure::CaptureUnavailable {
                reason: "no camera".into(),
            },
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure"]["kind"], "capture_unavailable");
        assert_eq!(json["failure"]["reason"], "no camera");
    }

    #[test]
    fn test_demo_files_load() {
        use config_loader::ConfigLoader;
        use std::path::Path;

        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let blueprint = ConfigLoader::load_from_path(&demos.join("blink_sync.toml")).unwrap();
        assert_eq!(blueprint.effective_sinks().len(), 2);

        for name in [
            "accept.toml",
            "too_early_retry.toml",
            "cancel.toml",
            "camera_unavailable.json",
        ] {
            let path = demos.join("scenarios").join(name);
            let scenario = ConfigLoader::load_scenario_from_path(&path)
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(!scenario.name.is_empty());
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        MonotonicClock, Outcome, Scenario, SessionFailure, SessionOutcome, SinkConfig, SinkType,
        SyncBlueprint,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{
        ClockedRecorder, IngestionPipeline, RuntimeClock, ScriptedBioSource, ScriptedVisualSource,
    };
    use observability::OutcomeAggregator;
    use sync_engine::{spawn_host, BlinkSyncEngine, HostOptions, HostStats, RetryPolicy};
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    const CONFIG_TOML: &str = r#"
[session]
max_retries = 0
on_exhausted = "give_up"

[recorder]
sample_rate_hz = 250.0
"#;

    struct RunResult {
        outcomes: Vec<SessionOutcome>,
        host: HostStats,
        lines: Vec<serde_json::Value>,
    }

    fn file_sink(path: &PathBuf) -> SinkConfig {
        SinkConfig {
            name: "jsonl".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 16,
            params: [("path".to_string(), path.display().to_string())].into(),
        }
    }

    fn scenario(toml: &str) -> Scenario {
        ConfigLoader::load_scenario_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    /// Config -> SessionHost -> scripted sources -> Dispatcher(file sink)
    ///
    /// `cancel_at_ms` plays the operator cancelling mid-session.
    async fn run_scenario(
        mut blueprint: SyncBlueprint,
        scenario: &Scenario,
        cancel_at_ms: Option<u64>,
    ) -> RunResult {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        blueprint.sinks = vec![file_sink(&path)];

        let clock: Arc<dyn MonotonicClock> = Arc::new(RuntimeClock::new());
        let recorder = Arc::new(ClockedRecorder::new(
            Arc::clone(&clock),
            blueprint.recorder.sample_rate_hz,
        ));
        let (handle, mut outcome_rx, host_task) = spawn_host(
            BlinkSyncEngine::new(blueprint.timing.clone()),
            Arc::clone(&clock),
            recorder,
            RetryPolicy::from_config(&blueprint.session),
            HostOptions::from(&blueprint.host),
        );

        let (dispatch_tx, dispatch_rx) = mpsc::channel(8);
        let dispatcher = create_dispatcher(blueprint.effective_sinks(), dispatch_rx).unwrap();
        let dispatcher_task = dispatcher.spawn();

        let mut ingestion = IngestionPipeline::new(handle.clone());
        ingestion.register_visual_source(Box::new(ScriptedVisualSource::from_scenario(
            "camera",
            scenario,
            Arc::clone(&clock),
        )));
        ingestion.register_bio_source(Box::new(ScriptedBioSource::from_scenario(
            "headband",
            scenario,
            Arc::clone(&clock),
        )));

        handle.start_session().await.unwrap();
        let _ = ingestion.start_all();

        if let Some(at_ms) = cancel_at_ms {
            let control = handle.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(at_ms)).await;
                let _ = control.cancel_session().await;
            });
        }

        let mut aggregator = OutcomeAggregator::new();
        let mut outcomes = Vec::new();
        let first = tokio::time::timeout(Duration::from_secs(600), outcome_rx.recv())
            .await
            .expect("session produced no outcome");
        if let Some(outcome) = first {
            aggregator.update(&outcome);
            dispatch_tx.send(outcome.clone()).await.unwrap();
            outcomes.push(outcome);
        }

        ingestion.stop_all();
        drop(ingestion);
        handle.shutdown().await.unwrap();
        drop(handle);

        while let Some(outcome) = outcome_rx.recv().await {
            aggregator.update(&outcome);
            dispatch_tx.send(outcome.clone()).await.unwrap();
            outcomes.push(outcome);
        }
        let host = host_task.await.unwrap();

        drop(dispatch_tx);
        let sink_metrics = dispatcher_task.await.unwrap();
        assert_eq!(sink_metrics[0].1.write_count, outcomes.len() as u64);
        assert_eq!(aggregator.summary().total_sessions, outcomes.len() as u64);

        let lines = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        RunResult {
            outcomes,
            host,
            lines,
        }
    }

    fn blueprint() -> SyncBlueprint {
        ConfigLoader::load_from_str(CONFIG_TOML, ConfigFormat::Toml).unwrap()
    }

    /// 视觉眨眼后 100 ms 到达伪迹 -> 接受
    #[tokio::test(start_paused = true)]
    async fn test_e2e_accepts_100ms_latency() {
        let scenario = scenario(
            r#"
name = "accept"

[[steps]]
at_ms = 0
action = "face"
blinking = false

[[steps]]
at_ms = 500
action = "face"
blinking = true

[[steps]]
at_ms = 600
action = "artifact"
blink = true
quality_good = true
"#,
        );

        let result = run_scenario(blueprint(), &scenario, None).await;

        assert_eq!(result.outcomes.len(), 1);
        let outcome = &result.outcomes[0];
        let m = outcome.outcome.blink_match().copied().unwrap();
        assert_eq!(m.latency_us, 100_000);
        assert_eq!(m.latency_ms(), 100);
        // 250 Hz, matched ~600 ms after the recorder started
        assert!((145..=155).contains(&m.sample_index), "index {}", m.sample_index);
        assert_eq!(outcome.counters.visual_blinks, 1);
        assert_eq!(outcome.counters.bio_blinks, 1);

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0]["outcome"]["status"], "accepted");
        assert_eq!(result.lines[0]["outcome"]["latency_us"], 100_000);
        assert_eq!(result.host.escalations, 0);
    }

    /// 30 ms 的伪迹过早，超时后重新等待并在第二次眨眼时接受
    #[tokio::test(start_paused = true)]
    async fn test_e2e_too_early_then_accepted() {
        let scenario = scenario(
            r#"
name = "too_early_then_ok"

[[steps]]
at_ms = 0
action = "face"
blinking = false

[[steps]]
at_ms = 500
action = "face"
blinking = true

[[steps]]
at_ms = 530
action = "artifact"
blink = true
quality_good = true

[[steps]]
at_ms = 3000
action = "face"
blinking = true

[[steps]]
at_ms = 3120
action = "artifact"
blink = true
quality_good = true
"#,
        );

        let result = run_scenario(blueprint(), &scenario, None).await;

        assert_eq!(result.outcomes.len(), 1);
        let outcome = &result.outcomes[0];
        assert_eq!(
            outcome.outcome.blink_match().map(|m| m.latency_us),
            Some(120_000)
        );
        assert_eq!(outcome.counters.bio_too_early, 1);
        assert_eq!(outcome.counters.visual_blinks, 2);
        assert_eq!(outcome.counters.bio_blinks, 2);
    }

    /// 从未出现伪迹 -> 会话超时，不重试直接失败
    #[tokio::test(start_paused = true)]
    async fn test_e2e_session_timeout_gives_up() {
        let scenario = scenario(
            r#"
name = "no_artifact"

[[steps]]
at_ms = 0
action = "face"
blinking = false

[[steps]]
at_ms = 500
action = "face"
blinking = true
"#,
        );

        let started = tokio::time::Instant::now();
        let result = run_scenario(blueprint(), &scenario, None).await;

        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(
            result.outcomes[0].outcome.failure(),
            Some(&SessionFailure::Timeout)
        );
        assert!(started.elapsed() >= Duration::from_secs(90));
        assert_eq!(result.host.escalations, 1);
        assert_eq!(result.lines[0]["outcome"]["failure"]["kind"], "timeout");
    }

    /// 摄像头不可用 -> Failed(CaptureUnavailable)
    #[tokio::test(start_paused = true)]
    async fn test_e2e_camera_unavailable() {
        let scenario = scenario(
            r#"
name = "no_camera"
camera_unavailable = "device busy"

[[steps]]
at_ms = 100
action = "artifact"
blink = true
quality_good = true
"#,
        );

        let result = run_scenario(blueprint(), &scenario, None).await;

        assert_eq!(result.outcomes.len(), 1);
        match &result.outcomes[0].outcome {
            Outcome::Failed {
                failure: SessionFailure::CaptureUnavailable { reason },
            } => assert_eq!(reason, "device busy"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // 头带源未启动，不应计数任何眨眼
        assert_eq!(result.outcomes[0].counters.bio_blinks, 0);
    }

    /// 操作员在等待伪迹时取消 -> Cancelled，且只有一个结果
    #[tokio::test(start_paused = true)]
    async fn test_e2e_cancel_mid_attempt() {
        let scenario = scenario(
            r#"
name = "cancel"

[[steps]]
at_ms = 0
action = "face"
blinking = false

[[steps]]
at_ms = 500
action = "face"
blinking = true

[[steps]]
at_ms = 900
action = "artifact"
blink = true
quality_good = true
"#,
        );

        let result = run_scenario(blueprint(), &scenario, Some(550)).await;

        assert_eq!(result.outcomes.len(), 1);
        assert!(result.outcomes[0].outcome.is_cancelled());
        assert_eq!(result.lines[0]["outcome"]["status"], "cancelled");
    }

    /// 短暂的质量下降不影响已记录的视觉眨眼
    #[tokio::test(start_paused = true)]
    async fn test_e2e_short_degradation_resumes() {
        let scenario = scenario(
            r#"
name = "wobble"

[[steps]]
at_ms = 0
action = "face"
blinking = false

[[steps]]
at_ms = 500
action = "face"
blinking = true

[[steps]]
at_ms = 520
action = "quality"
good = false
perfect = false

[[steps]]
at_ms = 560
action = "quality"
good = true
perfect = true

[[steps]]
at_ms = 640
action = "artifact"
blink = true
quality_good = true
"#,
        );

        let result = run_scenario(blueprint(), &scenario, None).await;

        assert_eq!(result.outcomes.len(), 1);
        let m = result.outcomes[0].outcome.blink_match().copied().unwrap();
        assert_eq!(m.visual_timestamp_us, 500_000);
        assert_eq!(m.latency_us, 140_000);
    }
}
