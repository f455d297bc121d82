//! # Ingestion Pipeline
//!
//! Source ingestion module.
//!
//! Responsibilities:
//! - Register camera / headband sources (scripted or real)
//! - Stamp and marshal every report into the session host queue
//! - Count reports dropped on a full queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, ScriptedVisualSource, ScriptedBioSource};
//!
//! let mut pipeline = IngestionPipeline::new(handle.clone());
//! pipeline.register_visual_source(Box::new(camera));
//! pipeline.register_bio_source(Box::new(headband));
//!
//! handle.start_session().await?;
//! pipeline.start_all()?;
//! ```
//!
//! ## Scripted Replay
//!
//! ```ignore
//! use ingestion::{RuntimeClock, ScriptedVisualSource};
//!
//! let clock: Arc<dyn MonotonicClock> = Arc::new(RuntimeClock::new());
//! let camera = ScriptedVisualSource::from_scenario("camera", &scenario, clock);
//! ```

mod clock;
mod error;
mod stats;
mod pipeline;
mod recorder;
mod scripted;
mod submit;

// Re-exports
pub use clock::RuntimeClock;
pub use error::{IngestionError, Result};
pub use stats::{IngestionMetrics, MetricsSnapshot};
pub use pipeline::IngestionPipeline;
pub use recorder::ClockedRecorder;
pub use scripted::{ScriptedBioSource, ScriptedVisualSource};
