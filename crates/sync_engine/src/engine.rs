//! Blink synchronization state machine.

use contracts::{
    ArtifactEvent, Decision, Escalation, Outcome, QualitySample, RecorderBridge, SessionFailure,
    SessionOutcome, StampedEvent, SyncEvent, SyncState, TimerKind, TimerToken, TimestampUs,
    TimingConfig, VisualEvent,
};
use tracing::{debug, info, instrument, warn};

use crate::effect::Effect;
use crate::quality::QualityVerdict;
use crate::session::Session;
use crate::timer::{TimerSlot, TimerSlots};
use crate::window::{LatencyVerdict, LatencyWindow};

/// Single-writer blink synchronization engine
///
/// `handle` is the only entry point. It never blocks and never fails; all
/// side effects come back as [`Effect`]s for the host to carry out.
#[derive(Debug)]
pub struct BlinkSyncEngine {
    timing: TimingConfig,
    window: LatencyWindow,
    state: SyncState,
    session: Option<Session>,
    next_session_id: u64,
    timers: TimerSlots,
    stale_timers: u64,
}

impl BlinkSyncEngine {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            window: LatencyWindow::from_timing(&timing),
            timing,
            state: SyncState::Idle,
            session: None,
            next_session_id: 1,
            timers: TimerSlots::new(),
            stale_timers: 0,
        }
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Session waiting on a host decision
    pub fn is_parked(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_parked)
    }

    /// Timer firings ignored because they were superseded
    pub fn stale_timer_count(&self) -> u64 {
        self.stale_timers
    }

    /// Apply one event
    #[instrument(
        level = "debug",
        name = "blink_engine_handle",
        skip(self, event, recorder),
        fields(event = event.event.name(), at = event.at, state = %self.state)
    )]
    pub fn handle(&mut self, event: StampedEvent, recorder: &dyn RecorderBridge) -> Vec<Effect> {
        observability::record_event_received(event.event.name());

        let mut effects = Vec::new();
        let now = event.at;

        match event.event {
            SyncEvent::Start => self.on_start(&mut effects),
            SyncEvent::Cancel => self.on_cancel(&mut effects),
            SyncEvent::CaptureUnavailable { reason } => {
                self.on_capture_unavailable(reason, &mut effects)
            }
            SyncEvent::Visual(visual) => self.on_visual(visual, now, &mut effects),
            SyncEvent::Artifact(artifact) => {
                self.on_artifact(artifact, now, recorder, &mut effects)
            }
            SyncEvent::Quality(sample) => self.on_quality(sample, now, &mut effects),
            SyncEvent::Decision(decision) => self.on_decision(decision, &mut effects),
            SyncEvent::Timer(token) => self.on_timer(token, &mut effects),
        }

        effects
    }

    fn on_start(&mut self, effects: &mut Vec<Effect>) {
        if let Some(session) = &self.session {
            warn!(session_id = session.id, "Start ignored, session already open");
            return;
        }

        let id = self.next_session_id;
        self.next_session_id += 1;
        self.session = Some(Session::new(id, self.timing.quality_grace_us()));
        info!(session_id = id, "Session started");

        self.arm(TimerKind::SessionDeadline, effects);
        self.enter(SyncState::WaitingForFace, effects);
    }

    fn on_cancel(&mut self, effects: &mut Vec<Effect>) {
        if self.session.is_none() {
            debug!("Cancel ignored, no session");
            return;
        }
        self.close(Outcome::Cancelled, effects);
    }

    fn on_capture_unavailable(&mut self, reason: String, effects: &mut Vec<Effect>) {
        if self.session.is_none() {
            warn!(reason = %reason, "Capture unavailable with no session");
            return;
        }
        warn!(reason = %reason, "Capture unavailable, failing session");
        self.close(
            Outcome::Failed {
                failure: SessionFailure::CaptureUnavailable { reason },
            },
            effects,
        );
    }

    fn on_visual(&mut self, visual: VisualEvent, now: TimestampUs, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.face_present = matches!(visual, VisualEvent::Face { .. });
        if session.is_parked() {
            return;
        }

        match visual {
            VisualEvent::NoFace => self.on_face_lost(effects),
            VisualEvent::Face { blinking } => self.on_face_sample(blinking, now, effects),
        }
    }

    fn on_face_lost(&mut self, effects: &mut Vec<Effect>) {
        match self.state {
            SyncState::WaitingForDeviceBlink => self.enter(SyncState::BlinkAborted, effects),
            SyncState::Idle
            | SyncState::QualityDegraded
            | SyncState::FaceLost
            | SyncState::BlinkAborted
            | SyncState::BlinkDetected => {}
            _ => self.enter(SyncState::WaitingForFace, effects),
        }
    }

    fn on_face_sample(&mut self, blinking: bool, now: TimestampUs, effects: &mut Vec<Effect>) {
        match self.state {
            SyncState::WaitingForFace => self.enter(SyncState::WaitingForVisualBlink, effects),
            SyncState::WaitingForVisualBlink if blinking => {
                self.enter(SyncState::WaitingForDeviceBlink, effects);
                if let Some(session) = self.session.as_mut() {
                    session.counters.visual_blinks += 1;
                    session.visual_blink_timestamp_us = Some(now);
                    debug!(visual_ts = now, "Visual blink started");
                }
            }
            SyncState::WaitingForDeviceBlink if !blinking => {
                let visual_ts = self
                    .session
                    .as_ref()
                    .and_then(|s| s.visual_blink_timestamp_us);
                if let Some(visual_ts) = visual_ts {
                    let duration = now - visual_ts;
                    if duration <= self.timing.min_visual_blink_us {
                        debug!(duration_us = duration, "Visual blink too short");
                        self.enter(SyncState::BlinkAborted, effects);
                    }
                }
            }
            SyncState::BlinkAborted if blinking => {
                self.enter(SyncState::BlinkAbortedRestart, effects)
            }
            _ => {}
        }
    }

    fn on_artifact(
        &mut self,
        artifact: ArtifactEvent,
        now: TimestampUs,
        recorder: &dyn RecorderBridge,
        effects: &mut Vec<Effect>,
    ) {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_parked() || !(artifact.blink && artifact.quality_good) {
            return;
        }
        session.counters.bio_blinks += 1;

        if state != SyncState::WaitingForDeviceBlink {
            debug!(state = %state, "Blink artifact outside device-blink wait");
            return;
        }
        let Some(visual_ts) = session.visual_blink_timestamp_us else {
            return;
        };

        let delta = now - visual_ts;
        let verdict = self.window.classify(delta);
        observability::record_artifact_verdict(verdict.as_str(), delta);

        match verdict {
            LatencyVerdict::Accepted => {
                let sample_index = recorder.current_sample_index();
                session.bio_blink_timestamp_us = Some(now);
                session.recorded_sample_index = Some(sample_index);
                info!(
                    latency_us = delta,
                    sample_index = sample_index,
                    "Blink match accepted"
                );
                self.enter(SyncState::BlinkDetected, effects);
            }
            LatencyVerdict::TooEarly => {
                session.counters.bio_too_early += 1;
                debug!(latency_us = delta, "Blink artifact too early");
                self.enter(SyncState::BlinkTimeout, effects);
            }
            LatencyVerdict::TooLate => {
                session.counters.bio_too_late += 1;
                debug!(latency_us = delta, "Blink artifact too late");
                self.enter(SyncState::BlinkTimeout, effects);
            }
        }
    }

    fn on_quality(&mut self, sample: QualitySample, now: TimestampUs, effects: &mut Vec<Effect>) {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_parked() {
            return;
        }

        match session.quality.observe(state, sample, now) {
            QualityVerdict::Steady => {}
            QualityVerdict::Degrade => {
                warn!(resume = %state, "Signal quality degraded, suspending");
                self.disarm(TimerSlot::State, effects);
                self.arm(TimerKind::QualityGrace, effects);
                self.set_state(SyncState::QualityDegraded, effects);
            }
            QualityVerdict::Restore(resume) => {
                info!(resume = %resume, "Signal quality restored");
                self.disarm(TimerSlot::QualityGrace, effects);
                self.set_state(resume, effects);
                if let Some(kind) = resume.timer_kind() {
                    self.arm(kind, effects);
                }
            }
            QualityVerdict::Expired => self.escalate(SessionFailure::QualityDegraded, effects),
        }
    }

    fn on_decision(&mut self, decision: Decision, effects: &mut Vec<Effect>) {
        let Some(pending) = self.session.as_ref().and_then(|s| s.pending.clone()) else {
            warn!(decision = ?decision, "Decision ignored, no pending escalation");
            return;
        };

        info!(decision = ?decision, failure = %pending.failure, "Escalation resolved");
        match decision {
            Decision::Retry => {
                let face_present = match self.session.as_mut() {
                    Some(session) => {
                        session.reset();
                        session.face_present
                    }
                    None => false,
                };
                self.arm(TimerKind::SessionDeadline, effects);
                self.enter(resume_by_face(face_present, SyncState::FaceDetected), effects);
            }
            Decision::GiveUp => self.close(
                Outcome::Failed {
                    failure: pending.failure,
                },
                effects,
            ),
            Decision::Cancel => self.close(Outcome::Cancelled, effects),
        }
    }

    fn on_timer(&mut self, token: TimerToken, effects: &mut Vec<Effect>) {
        let live = self.session_id() == Some(token.session) && self.timers.claim(token);
        if !live {
            self.stale_timers += 1;
            observability::record_stale_timer(token.kind.as_str());
            debug!(kind = token.kind.as_str(), seq = token.seq, "Stale timer ignored");
            return;
        }

        let face_present = self.session.as_ref().is_some_and(|s| s.face_present);
        match token.kind {
            TimerKind::SessionDeadline => {
                warn!("Session deadline elapsed");
                self.escalate(SessionFailure::Timeout, effects);
            }
            TimerKind::QualityGrace => {
                let expired = self
                    .session
                    .as_mut()
                    .is_some_and(|s| s.quality.grace_elapsed());
                if expired {
                    self.escalate(SessionFailure::QualityDegraded, effects);
                }
            }
            TimerKind::DeviceBlinkDeadline => self.enter(SyncState::BlinkTimeout, effects),
            TimerKind::AcceptGrace => {
                match self.session.as_ref().and_then(Session::blink_match) {
                    Some(blink_match) => self.close(Outcome::Accepted(blink_match), effects),
                    None => {
                        warn!("Accept grace elapsed without a recorded match");
                        self.arm(TimerKind::SessionDeadline, effects);
                        let next = resume_by_face(face_present, SyncState::WaitingForVisualBlink);
                        self.enter(next, effects);
                    }
                }
            }
            TimerKind::AbortSettle => {
                let next = resume_by_face(face_present, SyncState::WaitingForVisualBlink);
                self.enter(next, effects);
            }
            TimerKind::TimeoutRetry => {
                let next = if self.state == SyncState::BlinkTimeout {
                    SyncState::WaitingForVisualBlink
                } else {
                    resume_by_face(face_present, SyncState::WaitingForVisualBlink)
                };
                self.enter(next, effects);
            }
            TimerKind::FaceConfirm => {
                let next = if face_present {
                    SyncState::WaitingForVisualBlink
                } else {
                    SyncState::FaceLost
                };
                self.enter(next, effects);
            }
            TimerKind::FaceLostSettle => {
                self.enter(resume_by_face(face_present, SyncState::FaceDetected), effects)
            }
        }
    }

    /// Enter `next`, running its entry actions
    fn enter(&mut self, next: SyncState, effects: &mut Vec<Effect>) {
        if next == self.state {
            return;
        }
        self.disarm(TimerSlot::State, effects);

        if let Some(session) = self.session.as_mut() {
            match next {
                SyncState::WaitingForDeviceBlink => session.clear_bio(),
                SyncState::BlinkDetected | SyncState::QualityDegraded | SyncState::Idle => {}
                _ => session.clear_blink(),
            }
        }

        // 已记录的匹配只等 accept grace，会话超时不能再把它丢掉
        if next == SyncState::BlinkDetected {
            self.disarm(TimerSlot::SessionDeadline, effects);
        }

        self.set_state(next, effects);
        if let Some(kind) = next.timer_kind() {
            self.arm(kind, effects);
        }
    }

    fn set_state(&mut self, next: SyncState, effects: &mut Vec<Effect>) {
        let from = self.state;
        if from == next {
            return;
        }
        self.state = next;
        observability::record_transition(from, next);
        debug!(from = %from, to = %next, "Transition");
        effects.push(Effect::Transition { from, to: next });
    }

    fn arm(&mut self, kind: TimerKind, effects: &mut Vec<Effect>) {
        let Some(session_id) = self.session_id() else {
            return;
        };
        let (token, replaced) = self.timers.arm(session_id, kind);
        if let Some(old) = replaced {
            effects.push(Effect::CancelTimer(old));
        }
        effects.push(Effect::ScheduleTimer {
            token,
            after: self.timing.timer_duration(kind),
        });
    }

    fn disarm(&mut self, slot: TimerSlot, effects: &mut Vec<Effect>) {
        if let Some(token) = self.timers.disarm(slot) {
            effects.push(Effect::CancelTimer(token));
        }
    }

    fn disarm_all(&mut self, effects: &mut Vec<Effect>) {
        effects.extend(self.timers.disarm_all().into_iter().map(Effect::CancelTimer));
    }

    /// Park the session on a host decision
    fn escalate(&mut self, failure: SessionFailure, effects: &mut Vec<Effect>) {
        self.disarm_all(effects);
        self.set_state(SyncState::Idle, effects);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.clear_blink();
        session.quality.reset();

        let escalation = Escalation {
            session_id: session.id,
            needs_clean_data: failure == SessionFailure::QualityDegraded,
            failure,
            counters: session.counters,
        };
        warn!(
            session_id = escalation.session_id,
            failure = %escalation.failure,
            "Session escalated"
        );
        session.pending = Some(escalation.clone());
        effects.push(Effect::Escalate(escalation));
    }

    /// Close the session with its one terminal outcome
    fn close(&mut self, outcome: Outcome, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.disarm_all(effects);
        self.set_state(SyncState::Idle, effects);

        info!(
            session_id = session.id,
            outcome = outcome.label(),
            "Session closed"
        );
        effects.push(Effect::Emit(SessionOutcome {
            session_id: session.id,
            outcome,
            counters: session.counters,
        }));
    }
}

/// `with_face` when a face is in view, otherwise back to face search
fn resume_by_face(face_present: bool, with_face: SyncState) -> SyncState {
    if face_present {
        with_face
    } else {
        SyncState::WaitingForFace
    }
}
