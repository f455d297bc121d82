//! Scenario - scripted replay timeline
//!
//! A scenario drives the scripted visual/bio sources so a full session can be
//! replayed without a camera or a headband.

use serde::{Deserialize, Serialize};

use crate::{ArtifactEvent, BioSignal, QualitySample, VisualEvent};

/// Replay timeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// When set, the visual source reports this capture error at start
    #[serde(default)]
    pub camera_unavailable: Option<String>,

    /// Steps, ordered by `at_ms`
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

/// One timed action, relative to session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Camera frame with a face
    Face { blinking: bool },
    /// Camera frame without a face
    NoFace,
    /// Headband artifact packet
    Artifact { blink: bool, quality_good: bool },
    /// Headband quality notification
    Quality { good: bool, perfect: bool },
    /// Operator cancels the session
    Cancel,
}

/// Who replays a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChannel {
    Visual,
    Bio,
    Control,
}

impl ScenarioAction {
    pub fn channel(&self) -> StepChannel {
        match self {
            ScenarioAction::Face { .. } | ScenarioAction::NoFace => StepChannel::Visual,
            ScenarioAction::Artifact { .. } | ScenarioAction::Quality { .. } => StepChannel::Bio,
            ScenarioAction::Cancel => StepChannel::Control,
        }
    }

    pub fn as_visual(&self) -> Option<VisualEvent> {
        match *self {
            ScenarioAction::Face { blinking } => Some(VisualEvent::Face { blinking }),
            ScenarioAction::NoFace => Some(VisualEvent::NoFace),
            _ => None,
        }
    }

    pub fn as_bio(&self) -> Option<BioSignal> {
        match *self {
            ScenarioAction::Artifact {
                blink,
                quality_good,
            } => Some(BioSignal::Artifact(ArtifactEvent {
                blink,
                quality_good,
            })),
            ScenarioAction::Quality { good, perfect } => {
                Some(BioSignal::Quality(QualitySample { good, perfect }))
            }
            _ => None,
        }
    }
}

impl Scenario {
    /// Steps replayed by one channel, in timeline order
    pub fn steps_for(&self, channel: StepChannel) -> impl Iterator<Item = &ScenarioStep> {
        self.steps
            .iter()
            .filter(move |step| step.action.channel() == channel)
    }

    /// Time of the last step
    pub fn duration_ms(&self) -> u64 {
        self.steps.iter().map(|step| step.at_ms).max().unwrap_or(0)
    }
}
