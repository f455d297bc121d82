//! Effects returned by the state machine, interpreted by the host.

use std::time::Duration;

use contracts::{Escalation, SessionOutcome, SyncState, TimerToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `Timer(token)` after `after`
    ScheduleTimer { token: TimerToken, after: Duration },
    /// Drop a pending timer
    CancelTimer(TimerToken),
    /// The active state changed
    Transition { from: SyncState, to: SyncState },
    /// Terminal outcome of a session
    Emit(SessionOutcome),
    /// The session is parked until the host sends a `Decision`
    Escalate(Escalation),
}

impl Effect {
    pub fn as_emit(&self) -> Option<&SessionOutcome> {
        match self {
            Effect::Emit(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn as_escalation(&self) -> Option<&Escalation> {
        match self {
            Effect::Escalate(escalation) => Some(escalation),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<(SyncState, SyncState)> {
        match self {
            Effect::Transition { from, to } => Some((*from, *to)),
            _ => None,
        }
    }
}
