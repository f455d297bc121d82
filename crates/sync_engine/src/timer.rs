//! Generation-tagged timer slots.
//!
//! A session owns three slots. Arming a slot replaces whatever was armed
//! there, and a firing only counts if its token is still the armed one.

use contracts::{TimerKind, TimerToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSlot {
    /// Timer owned by the active state
    State,
    /// Whole-session deadline
    SessionDeadline,
    /// Degraded-quality grace
    QualityGrace,
}

impl TimerSlot {
    pub fn of(kind: TimerKind) -> Self {
        match kind {
            TimerKind::SessionDeadline => TimerSlot::SessionDeadline,
            TimerKind::QualityGrace => TimerSlot::QualityGrace,
            _ => TimerSlot::State,
        }
    }
}

#[derive(Debug, Default)]
pub struct TimerSlots {
    next_seq: u64,
    state: Option<TimerToken>,
    session_deadline: Option<TimerToken>,
    quality_grace: Option<TimerToken>,
}

impl TimerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer of `kind` for `session`
    ///
    /// Returns the new token and the token it replaced, if any.
    pub fn arm(&mut self, session: u64, kind: TimerKind) -> (TimerToken, Option<TimerToken>) {
        self.next_seq += 1;
        let token = TimerToken {
            session,
            seq: self.next_seq,
            kind,
        };
        let replaced = self.slot_mut(TimerSlot::of(kind)).replace(token);
        (token, replaced)
    }

    pub fn disarm(&mut self, slot: TimerSlot) -> Option<TimerToken> {
        self.slot_mut(slot).take()
    }

    /// Disarm every slot, returning what was armed
    pub fn disarm_all(&mut self) -> Vec<TimerToken> {
        [
            TimerSlot::State,
            TimerSlot::SessionDeadline,
            TimerSlot::QualityGrace,
        ]
        .into_iter()
        .filter_map(|slot| self.disarm(slot))
        .collect()
    }

    /// Consume a firing
    ///
    /// True (and the slot is cleared) only if `token` is the armed one.
    pub fn claim(&mut self, token: TimerToken) -> bool {
        let slot = self.slot_mut(TimerSlot::of(token.kind));
        if *slot == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn armed(&self, slot: TimerSlot) -> Option<TimerToken> {
        match slot {
            TimerSlot::State => self.state,
            TimerSlot::SessionDeadline => self.session_deadline,
            TimerSlot::QualityGrace => self.quality_grace,
        }
    }

    fn slot_mut(&mut self, slot: TimerSlot) -> &mut Option<TimerToken> {
        match slot {
            TimerSlot::State => &mut self.state,
            TimerSlot::SessionDeadline => &mut self.session_deadline,
            TimerSlot::QualityGrace => &mut self.quality_grace,
        }
    }
}
