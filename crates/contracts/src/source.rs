//! Collaborator traits - visual source, bio-signal source, recorder
//!
//! The camera pipeline, headband service and EEG recorder live outside this
//! workspace. They are consumed through these traits so that real devices and
//! scripted replays can be swapped without touching the state machine.

use std::sync::Arc;

use crate::{ArtifactEvent, QualitySample, TimestampUs, VisualEvent};

/// Visual data callback type
///
/// Every report carries the timestamp it was observed at, taken from the
/// shared monotonic clock.
pub type VisualCallback = Arc<dyn Fn(TimestampUs, VisualEvent) + Send + Sync>;

/// Face-tracking source
///
/// # Example
///
/// ```ignore
/// let camera: Box<dyn VisualSource> = get_camera();
/// if let Some(reason) = camera.capture_error() {
///     // report CaptureUnavailable
/// }
/// camera.listen(Arc::new(|at, event| println!("{at}: {event:?}")));
/// camera.stop();
/// ```
pub trait VisualSource: Send + Sync {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Capture failure that prevents the source from producing samples
    fn capture_error(&self) -> Option<String> {
        None
    }

    /// Register data callback
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: VisualCallback);

    /// Stop listening
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

/// Report from the headband service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioSignal {
    Artifact(ArtifactEvent),
    Quality(QualitySample),
}

/// Bio-signal data callback type
pub type BioSignalCallback = Arc<dyn Fn(TimestampUs, BioSignal) + Send + Sync>;

/// Headband artifact / quality source
pub trait BioSignalSource: Send + Sync {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Register data callback
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: BioSignalCallback);

    /// Stop listening
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

/// EEG recorder bridge
///
/// Read exactly once, at the instant a blink match is accepted.
pub trait RecorderBridge: Send + Sync {
    /// Index of the most recent EEG sample written by the recorder
    fn current_sample_index(&self) -> u64;
}

impl<F> RecorderBridge for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn current_sample_index(&self) -> u64 {
        self()
    }
}
