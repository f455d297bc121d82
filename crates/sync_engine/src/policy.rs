//! Escalation decision policies.

use contracts::{Decision, Escalation, ExhaustedAction, SessionPolicyConfig};
use tracing::debug;

/// Answers an escalation with a decision
///
/// Called on the host task; must not block.
pub trait DecisionPolicy: Send {
    fn decide(&mut self, escalation: &Escalation) -> Decision;
}

impl<F> DecisionPolicy for F
where
    F: FnMut(&Escalation) -> Decision + Send,
{
    fn decide(&mut self, escalation: &Escalation) -> Decision {
        self(escalation)
    }
}

/// Retry up to `max_retries` times per session, then apply `on_exhausted`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    on_exhausted: ExhaustedAction,
    session_id: Option<u64>,
    used: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, on_exhausted: ExhaustedAction) -> Self {
        Self {
            max_retries,
            on_exhausted,
            session_id: None,
            used: 0,
        }
    }

    pub fn from_config(config: &SessionPolicyConfig) -> Self {
        Self::new(config.max_retries, config.on_exhausted)
    }

    /// Never retry
    pub fn give_up() -> Self {
        Self::new(0, ExhaustedAction::GiveUp)
    }

    pub fn retries_used(&self) -> u32 {
        self.used
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SessionPolicyConfig::default())
    }
}

impl DecisionPolicy for RetryPolicy {
    fn decide(&mut self, escalation: &Escalation) -> Decision {
        if self.session_id != Some(escalation.session_id) {
            self.session_id = Some(escalation.session_id);
            self.used = 0;
        }

        let decision = if self.used < self.max_retries {
            self.used += 1;
            Decision::Retry
        } else {
            match self.on_exhausted {
                ExhaustedAction::GiveUp => Decision::GiveUp,
                ExhaustedAction::Cancel => Decision::Cancel,
            }
        };
        debug!(
            session_id = escalation.session_id,
            retries_used = self.used,
            decision = ?decision,
            "Escalation policy decided"
        );
        decision
    }
}
