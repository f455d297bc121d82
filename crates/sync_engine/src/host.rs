//! SessionHost - single task owning the blink engine
//!
//! Every input (commands, source reports, timer firings, decisions) is a
//! message on one bounded queue, so the engine only ever sees one event at a
//! time. Timer tasks and decision deliveries hold weak senders: dropping the
//! last `SessionHandle` closes the queue and stops the host.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Decision, HostConfig, MonotonicClock, RecorderBridge, SessionOutcome, StampedEvent, SyncEvent,
    SyncState, TimerToken, TimestampUs,
};

use crate::effect::Effect;
use crate::engine::BlinkSyncEngine;
use crate::error::SyncError;
use crate::policy::DecisionPolicy;

const DEFAULT_OUTCOME_CAPACITY: usize = 16;

/// Message on the host queue
#[derive(Debug)]
pub enum HostMessage {
    Event(StampedEvent),
    Shutdown,
}

/// Host queue sizing
#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    pub queue_capacity: usize,
    pub outcome_capacity: usize,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self::from(&HostConfig::default())
    }
}

impl From<&HostConfig> for HostOptions {
    fn from(config: &HostConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity.max(1),
            outcome_capacity: DEFAULT_OUTCOME_CAPACITY,
        }
    }
}

/// Counters reported when the host stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStats {
    pub events_processed: u64,
    pub outcomes_emitted: u64,
    pub escalations: u64,
    pub retries: u64,
    pub timers_scheduled: u64,
    pub timers_cancelled: u64,
    pub stale_timers: u64,
}

/// Clonable front-end to a running host
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<HostMessage>,
    clock: Arc<dyn MonotonicClock>,
    state_rx: watch::Receiver<SyncState>,
}

impl SessionHandle {
    /// Open a new session
    pub async fn start_session(&self) -> Result<(), SyncError> {
        self.submit(SyncEvent::Start).await
    }

    /// Close the current session as cancelled
    pub async fn cancel_session(&self) -> Result<(), SyncError> {
        self.submit(SyncEvent::Cancel).await
    }

    /// Queue an event stamped with the current time
    pub async fn submit(&self, event: SyncEvent) -> Result<(), SyncError> {
        self.submit_at(self.now_us(), event).await
    }

    /// Queue an event observed at `at`
    pub async fn submit_at(&self, at: TimestampUs, event: SyncEvent) -> Result<(), SyncError> {
        self.tx
            .send(HostMessage::Event(StampedEvent::new(at, event)))
            .await
            .map_err(|_| SyncError::HostClosed)
    }

    /// Queue an event without waiting (for source callbacks)
    pub fn try_submit_at(&self, at: TimestampUs, event: SyncEvent) -> Result<(), SyncError> {
        let name = event.name();
        match self.tx.try_send(HostMessage::Event(StampedEvent::new(at, event))) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(SyncError::QueueFull { event: name }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SyncError::HostClosed),
        }
    }

    /// Ask the host to stop; an open session is cancelled first
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.tx
            .send(HostMessage::Shutdown)
            .await
            .map_err(|_| SyncError::HostClosed)
    }

    /// Watch the active state
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> SyncState {
        *self.state_rx.borrow()
    }

    /// Wait until the host reports `target`
    pub async fn wait_for_state(&self, target: SyncState) -> Result<(), SyncError> {
        let mut rx = self.state();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::HostClosed)
    }

    /// Time on the host's clock
    pub fn now_us(&self) -> TimestampUs {
        self.clock.now_us()
    }

    pub fn clock(&self) -> Arc<dyn MonotonicClock> {
        Arc::clone(&self.clock)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Task state of the host
pub struct SessionHost {
    engine: BlinkSyncEngine,
    rx: mpsc::Receiver<HostMessage>,
    weak_tx: mpsc::WeakSender<HostMessage>,
    clock: Arc<dyn MonotonicClock>,
    recorder: Arc<dyn RecorderBridge>,
    policy: Box<dyn DecisionPolicy>,
    timers: HashMap<TimerToken, JoinHandle<()>>,
    state_tx: watch::Sender<SyncState>,
    outcome_tx: mpsc::Sender<SessionOutcome>,
    stats: HostStats,
}

impl SessionHost {
    /// Build a host, its handle and the outcome stream
    pub fn new(
        engine: BlinkSyncEngine,
        clock: Arc<dyn MonotonicClock>,
        recorder: Arc<dyn RecorderBridge>,
        policy: impl DecisionPolicy + 'static,
        options: HostOptions,
    ) -> (Self, SessionHandle, mpsc::Receiver<SessionOutcome>) {
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let (outcome_tx, outcome_rx) = mpsc::channel(options.outcome_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(engine.state());

        let host = Self {
            engine,
            rx,
            weak_tx: tx.downgrade(),
            clock: Arc::clone(&clock),
            recorder,
            policy: Box::new(policy),
            timers: HashMap::new(),
            state_tx,
            outcome_tx,
            stats: HostStats::default(),
        };
        let handle = SessionHandle {
            tx,
            clock,
            state_rx,
        };
        (host, handle, outcome_rx)
    }

    /// Spawn the host loop as a background task
    pub fn spawn(self) -> JoinHandle<HostStats> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown or until every handle is dropped
    #[instrument(name = "session_host_run", skip(self))]
    pub async fn run(mut self) -> HostStats {
        info!("Session host started");

        while let Some(message) = self.rx.recv().await {
            match message {
                HostMessage::Event(event) => self.dispatch(event).await,
                HostMessage::Shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        // Exactly one outcome per session, even on shutdown
        if self.engine.session().is_some() {
            let at = self.clock.now_us();
            self.dispatch(StampedEvent::new(at, SyncEvent::Cancel)).await;
        }

        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        self.stats.stale_timers = self.engine.stale_timer_count();

        info!(
            events = self.stats.events_processed,
            outcomes = self.stats.outcomes_emitted,
            escalations = self.stats.escalations,
            "Session host stopped"
        );
        self.stats
    }

    async fn dispatch(&mut self, event: StampedEvent) {
        self.stats.events_processed += 1;
        if let SyncEvent::Timer(token) = &event.event {
            self.timers.remove(token);
        }

        let effects = self.engine.handle(event, self.recorder.as_ref());
        for effect in effects {
            self.apply(effect).await;
        }
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleTimer { token, after } => self.schedule(token, after),
            Effect::CancelTimer(token) => {
                if let Some(timer) = self.timers.remove(&token) {
                    timer.abort();
                    self.stats.timers_cancelled += 1;
                }
            }
            Effect::Transition { to, .. } => {
                self.state_tx.send_replace(to);
            }
            Effect::Emit(outcome) => {
                self.stats.outcomes_emitted += 1;
                observability::record_outcome(&outcome);
                if self.outcome_tx.send(outcome).await.is_err() {
                    warn!("Outcome receiver dropped, outcome discarded");
                }
            }
            Effect::Escalate(escalation) => {
                self.stats.escalations += 1;
                observability::record_escalation(&escalation);

                let decision = self.policy.decide(&escalation);
                if decision == Decision::Retry {
                    self.stats.retries += 1;
                }
                self.deliver_decision(decision);
            }
        }
    }

    fn schedule(&mut self, token: TimerToken, after: Duration) {
        let weak = self.weak_tx.clone();
        let clock = Arc::clone(&self.clock);

        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(tx) = weak.upgrade() {
                let event = StampedEvent::new(clock.now_us(), SyncEvent::Timer(token));
                let _ = tx.send(HostMessage::Event(event)).await;
            }
        });
        self.timers.insert(token, timer);
        self.stats.timers_scheduled += 1;
    }

    // The queue may be full; the decision is delivered off the host task.
    fn deliver_decision(&self, decision: Decision) {
        let Some(tx) = self.weak_tx.upgrade() else {
            warn!(decision = ?decision, "Host closing, decision dropped");
            return;
        };
        let event = StampedEvent::new(self.clock.now_us(), SyncEvent::Decision(decision));
        tokio::spawn(async move {
            if tx.send(HostMessage::Event(event)).await.is_err() {
                error!("Host closed before decision was delivered");
            }
        });
    }
}

/// Build and spawn a host in one step
pub fn spawn_host(
    engine: BlinkSyncEngine,
    clock: Arc<dyn MonotonicClock>,
    recorder: Arc<dyn RecorderBridge>,
    policy: impl DecisionPolicy + 'static,
    options: HostOptions,
) -> (
    SessionHandle,
    mpsc::Receiver<SessionOutcome>,
    JoinHandle<HostStats>,
) {
    let (host, handle, outcomes) = SessionHost::new(engine, clock, recorder, policy, options);
    (handle, outcomes, host.spawn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ArtifactEvent, Escalation, SessionFailure, TimingConfig, VisualEvent};
    use tokio::time::{sleep, Instant};

    use crate::policy::RetryPolicy;

    /// Clock on tokio time, so paused tests stamp deterministically
    struct PausedClock(Instant);

    impl MonotonicClock for PausedClock {
        fn now_us(&self) -> TimestampUs {
            self.0.elapsed().as_micros() as TimestampUs
        }
    }

    fn start_host(
        policy: impl DecisionPolicy + 'static,
    ) -> (
        SessionHandle,
        mpsc::Receiver<SessionOutcome>,
        JoinHandle<HostStats>,
    ) {
        let clock: Arc<dyn MonotonicClock> = Arc::new(PausedClock(Instant::now()));
        let recorder: Arc<dyn RecorderBridge> = Arc::new(|| 777u64);
        spawn_host(
            BlinkSyncEngine::new(TimingConfig::default()),
            clock,
            recorder,
            policy,
            HostOptions::default(),
        )
    }

    async fn face(handle: &SessionHandle, blinking: bool) {
        handle
            .submit(SyncEvent::Visual(VisualEvent::Face { blinking }))
            .await
            .unwrap();
    }

    async fn artifact(handle: &SessionHandle) {
        handle
            .submit(SyncEvent::Artifact(ArtifactEvent {
                blink: true,
                quality_good: true,
            }))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_accepts_match() {
        let (handle, mut outcomes, join) = start_host(RetryPolicy::give_up());

        handle.start_session().await.unwrap();
        face(&handle, false).await;
        sleep(Duration::from_millis(500)).await;
        face(&handle, true).await;
        sleep(Duration::from_millis(100)).await;
        artifact(&handle).await;
        handle
            .wait_for_state(SyncState::BlinkDetected)
            .await
            .unwrap();
        assert!(outcomes.try_recv().is_err());

        let outcome = outcomes.recv().await.unwrap();
        let m = outcome.outcome.blink_match().copied().unwrap();
        assert_eq!(m.latency_us, 100_000);
        assert_eq!(m.sample_index, 777);
        assert_eq!(handle.current_state(), SyncState::Idle);

        handle.shutdown().await.unwrap();
        let stats = join.await.unwrap();
        assert_eq!(stats.outcomes_emitted, 1);
        assert_eq!(stats.escalations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_deadline_gives_up() {
        let started = Instant::now();
        let (handle, mut outcomes, join) = start_host(RetryPolicy::give_up());

        handle.start_session().await.unwrap();
        face(&handle, false).await;

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.outcome.failure(), Some(&SessionFailure::Timeout));
        assert!(started.elapsed() >= Duration::from_secs(90));

        drop(handle);
        let stats = join.await.unwrap();
        assert_eq!(stats.escalations, 1);
        assert_eq!(stats.retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_retries_before_giving_up() {
        let started = Instant::now();
        let (handle, mut outcomes, join) =
            start_host(RetryPolicy::new(1, contracts::ExhaustedAction::GiveUp));

        handle.start_session().await.unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.outcome.failure(), Some(&SessionFailure::Timeout));
        assert!(started.elapsed() >= Duration::from_secs(180));

        handle.shutdown().await.unwrap();
        let stats = join.await.unwrap();
        assert_eq!(stats.escalations, 2);
        assert_eq!(stats.retries, 1);
        assert_eq!(stats.outcomes_emitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_policy_sees_clean_data_flag() {
        let (handle, mut outcomes, _join) = start_host(|escalation: &Escalation| {
            if escalation.needs_clean_data {
                Decision::Cancel
            } else {
                Decision::GiveUp
            }
        });

        handle.start_session().await.unwrap();
        handle
            .submit(SyncEvent::Quality(contracts::QualitySample::poor()))
            .await
            .unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert!(outcome.outcome.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_pending_accept() {
        let (handle, mut outcomes, join) = start_host(RetryPolicy::give_up());

        handle.start_session().await.unwrap();
        face(&handle, false).await;
        face(&handle, true).await;
        sleep(Duration::from_millis(100)).await;
        artifact(&handle).await;
        handle.cancel_session().await.unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert!(outcome.outcome.is_cancelled());

        sleep(Duration::from_secs(5)).await;
        assert!(outcomes.try_recv().is_err());

        handle.shutdown().await.unwrap();
        let stats = join.await.unwrap();
        assert!(stats.timers_cancelled >= 2);
        assert_eq!(stats.stale_timers, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_open_session() {
        let (handle, mut outcomes, join) = start_host(RetryPolicy::give_up());

        handle.start_session().await.unwrap();
        handle.shutdown().await.unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert!(outcome.outcome.is_cancelled());
        join.await.unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_host() {
        let (handle, _outcomes, join) = start_host(RetryPolicy::give_up());
        let clone = handle.clone();
        drop(handle);
        drop(clone);

        let stats = join.await.unwrap();
        assert_eq!(stats.events_processed, 0);
    }

    #[tokio::test]
    async fn test_try_submit_reports_full_queue() {
        let clock: Arc<dyn MonotonicClock> = Arc::new(PausedClock(Instant::now()));
        let recorder: Arc<dyn RecorderBridge> = Arc::new(|| 0u64);
        let (_host, handle, _outcomes) = SessionHost::new(
            BlinkSyncEngine::new(TimingConfig::default()),
            clock,
            recorder,
            RetryPolicy::give_up(),
            HostOptions {
                queue_capacity: 1,
                outcome_capacity: 1,
            },
        );

        assert!(handle.try_submit_at(0, SyncEvent::Start).is_ok());
        assert!(matches!(
            handle.try_submit_at(0, SyncEvent::Cancel),
            Err(SyncError::QueueFull { event: "cancel" })
        ));
    }
}
