//! Session orchestrator - wires host, scripted sources and dispatcher.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Decision, Escalation, MonotonicClock, Scenario, StepChannel, SyncBlueprint};
use ingestion::{
    ClockedRecorder, IngestionError, IngestionPipeline, RuntimeClock, ScriptedBioSource,
    ScriptedVisualSource,
};
use observability::OutcomeAggregator;
use sync_engine::{
    spawn_host, BlinkSyncEngine, DecisionPolicy, HostOptions, RetryPolicy, SessionHandle,
    SessionOutcome,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::RunStats;

/// Slack added to the derived wait budget
const WAIT_SLACK: Duration = Duration::from_secs(5);

/// How long sinks get to drain after the session closed
const DISPATCH_DRAIN: Duration = Duration::from_secs(5);

/// Session run configuration
#[derive(Debug, Clone)]
pub struct SessionRunConfig {
    pub blueprint: SyncBlueprint,
    pub scenario: Scenario,

    /// Wait budget for the outcome (None = derived from timing and retries)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl SessionRunConfig {
    /// Long enough for every retry to time out, plus the whole scenario
    pub fn wait_budget(&self) -> Duration {
        self.timeout.unwrap_or_else(|| {
            let attempts = self.blueprint.session.max_retries.saturating_add(1);
            self.blueprint.timing.session_timeout() * attempts
                + Duration::from_millis(self.scenario.duration_ms())
                + WAIT_SLACK
        })
    }
}

/// One blink sync session driven by a scenario
pub struct SessionRun {
    config: SessionRunConfig,
}

impl SessionRun {
    pub fn new(config: SessionRunConfig) -> Self {
        Self { config }
    }

    /// Run the session to its outcome, then shut everything down
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let scenario = &self.config.scenario;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let aggregator = Arc::new(Mutex::new(OutcomeAggregator::new()));

        // Session host
        let clock: Arc<dyn MonotonicClock> = Arc::new(RuntimeClock::new());
        let recorder = Arc::new(ClockedRecorder::new(
            Arc::clone(&clock),
            blueprint.recorder.sample_rate_hz,
        ));
        let engine = BlinkSyncEngine::new(blueprint.timing.clone());
        let policy = counting_policy(
            RetryPolicy::from_config(&blueprint.session),
            Arc::clone(&aggregator),
        );
        let (handle, mut outcome_rx, host_task) = spawn_host(
            engine,
            Arc::clone(&clock),
            recorder,
            policy,
            HostOptions::from(&blueprint.host),
        );

        info!(
            max_retries = blueprint.session.max_retries,
            on_exhausted = ?blueprint.session.on_exhausted,
            queue_capacity = blueprint.host.queue_capacity,
            "Session host started"
        );

        // Dispatcher
        let sinks = blueprint.effective_sinks();
        let active_sinks = sinks.len();
        let (dispatch_tx, dispatch_rx) = mpsc::channel::<SessionOutcome>(active_sinks.max(1) * 4);
        let dispatcher = dispatcher::create_dispatcher(sinks, dispatch_rx)
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Scripted sources
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

        handle
            .start_session()
            .await
            .context("Failed to start session")?;

        match ingestion.start_all() {
            Ok(()) => {}
            Err(IngestionError::CaptureUnavailable {
                source_name,
                reason,
            }) => {
                // The host closes the session with CaptureUnavailable.
                warn!(source = %source_name, reason = %reason, "Camera unavailable");
            }
            Err(e) => return Err(e).context("Failed to start sources"),
        }
        let control = spawn_control_steps(handle.clone(), scenario);

        info!(
            scenario = %scenario.name,
            steps = scenario.steps.len(),
            "Scenario replay running"
        );

        // Wait for the outcome
        let budget = self.config.wait_budget();
        let mut timed_out = false;
        let mut interrupted = false;
        let first = tokio::select! {
            received = tokio::time::timeout(budget, outcome_rx.recv()) => match received {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(budget_secs = budget.as_secs(), "No outcome within wait budget");
                    timed_out = true;
                    None
                }
            },
            _ = shutdown_signal() => {
                warn!("Received shutdown signal, cancelling session...");
                interrupted = true;
                None
            }
        };

        let mut outcomes = Vec::new();
        if let Some(outcome) = first {
            forward(outcome, &aggregator, &dispatch_tx, &mut outcomes).await;
        }

        // Shutdown: an open session is cancelled by the host on the way out
        info!("Shutting down session host...");
        ingestion.stop_all();
        let ingestion_metrics = ingestion.metrics().snapshot();
        drop(ingestion);
        if let Some(control) = control {
            control.abort();
        }
        if let Err(e) = handle.shutdown().await {
            debug!(error = %e, "Host already stopped");
        }
        drop(handle);

        while let Some(outcome) = outcome_rx.recv().await {
            forward(outcome, &aggregator, &dispatch_tx, &mut outcomes).await;
        }
        let host_stats = host_task.await.context("Session host task failed")?;

        drop(dispatch_tx);
        let sink_metrics = match tokio::time::timeout(DISPATCH_DRAIN, dispatcher_handle).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Dispatcher did not drain in time");
                Vec::new()
            }
        };

        let summary = aggregator
            .lock()
            .map(|agg| agg.summary())
            .unwrap_or_default();

        let stats = RunStats {
            scenario: scenario.name.clone(),
            duration: start_time.elapsed(),
            outcomes,
            summary,
            host: host_stats,
            ingestion: ingestion_metrics,
            sinks: sink_metrics,
            timed_out,
            interrupted,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            outcomes = stats.outcomes.len(),
            "Session run complete"
        );

        Ok(stats)
    }
}

/// Retry policy that also feeds every escalation into the aggregator
fn counting_policy(
    mut retry: RetryPolicy,
    aggregator: Arc<Mutex<OutcomeAggregator>>,
) -> impl DecisionPolicy + 'static {
    move |escalation: &Escalation| -> Decision {
        if let Ok(mut agg) = aggregator.lock() {
            agg.record_escalation(escalation);
        }
        retry.decide(escalation)
    }
}

async fn forward(
    outcome: SessionOutcome,
    aggregator: &Mutex<OutcomeAggregator>,
    dispatch_tx: &mpsc::Sender<SessionOutcome>,
    outcomes: &mut Vec<SessionOutcome>,
) {
    info!(
        session_id = outcome.session_id,
        outcome = outcome.outcome.label(),
        "Session outcome"
    );
    if let Ok(mut agg) = aggregator.lock() {
        agg.update(&outcome);
    }
    if dispatch_tx.send(outcome.clone()).await.is_err() {
        warn!("Dispatcher channel closed");
    }
    outcomes.push(outcome);
}

/// Replay the scenario's operator steps (cancel) against the host
fn spawn_control_steps(handle: SessionHandle, scenario: &Scenario) -> Option<JoinHandle<()>> {
    let steps: Vec<u64> = scenario
        .steps_for(StepChannel::Control)
        .map(|step| step.at_ms)
        .collect();
    if steps.is_empty() {
        return None;
    }

    Some(tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        for at_ms in steps {
            tokio::time::sleep_until(start + Duration::from_millis(at_ms)).await;
            debug!(at_ms, "Scenario cancel step");
            if handle.cancel_session().await.is_err() {
                break;
            }
        }
    }))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ScenarioStep;

    fn config(timeout: Option<Duration>) -> SessionRunConfig {
        SessionRunConfig {
            blueprint: SyncBlueprint::default(),
            scenario: Scenario {
                name: "t".into(),
                steps: vec![ScenarioStep {
                    at_ms: 2_000,
                    action: contracts::ScenarioAction::NoFace,
                }],
                ..Default::default()
            },
            timeout,
            metrics_port: None,
        }
    }

    #[test]
    fn test_wait_budget_derived_from_retries() {
        // 90 s session timeout, one retry, 2 s scenario, 5 s slack
        assert_eq!(config(None).wait_budget(), Duration::from_secs(187));
    }

    #[test]
    fn test_wait_budget_override() {
        let budget = config(Some(Duration::from_secs(3))).wait_budget();
        assert_eq!(budget, Duration::from_secs(3));
    }
}
