//! Ingestion Pipeline main entry

use std::sync::Arc;

use contracts::{BioSignalSource, SyncEvent, VisualSource};
use sync_engine::SessionHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::stats::IngestionMetrics;
use crate::submit::{bio_callback, visual_callback};

/// Ingestion Pipeline
///
/// Owns the registered visual and bio-signal sources and marshals every
/// report they produce into the session host queue.
pub struct IngestionPipeline {
    /// Host queue every source reports into
    handle: SessionHandle,

    /// Registered camera sources
    visual: Vec<Box<dyn VisualSource>>,

    /// Registered headband sources
    bio: Vec<Box<dyn BioSignalSource>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline reporting into `handle`
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            visual: Vec::new(),
            bio: Vec::new(),
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Register camera source
    #[instrument(
        name = "ingestion_register_visual_source",
        skip(self, source),
        fields(source = %source.name())
    )]
    pub fn register_visual_source(&mut self, source: Box<dyn VisualSource>) {
        debug!(source = %source.name(), "registered visual source");
        self.visual.push(source);
    }

    /// Register headband source
    #[instrument(
        name = "ingestion_register_bio_source",
        skip(self, source),
        fields(source = %source.name())
    )]
    pub fn register_bio_source(&mut self, source: Box<dyn BioSignalSource>) {
        debug!(source = %source.name(), "registered bio source");
        self.bio.push(source);
    }

    /// Start all registered sources
    ///
    /// A camera that cannot capture is reported to the host as
    /// `CaptureUnavailable` and nothing is started.
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) -> Result<()> {
        if let Some((source_name, reason)) = self.capture_failure() {
            warn!(source = %source_name, reason = %reason, "visual capture unavailable");
            self.handle
                .try_submit_at(
                    self.handle.now_us(),
                    SyncEvent::CaptureUnavailable {
                        reason: reason.clone(),
                    },
                )
                .map_err(|_| IngestionError::HostClosed)?;
            return Err(IngestionError::CaptureUnavailable {
                source_name,
                reason,
            });
        }

        info!(
            visual = self.visual.len(),
            bio = self.bio.len(),
            "starting all sources"
        );
        for source in &self.visual {
            if !source.is_listening() {
                debug!(source = %source.name(), "starting visual source");
                source.listen(visual_callback(
                    self.handle.clone(),
                    Arc::clone(&self.metrics),
                    source.name().to_string(),
                ));
            }
        }
        for source in &self.bio {
            if !source.is_listening() {
                debug!(source = %source.name(), "starting bio source");
                source.listen(bio_callback(
                    self.handle.clone(),
                    Arc::clone(&self.metrics),
                    source.name().to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.source_count(), "stopping all sources");
        for source in &self.visual {
            if source.is_listening() {
                source.stop();
            }
        }
        for source in &self.bio {
            if source.is_listening() {
                source.stop();
            }
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.visual.len() + self.bio.len()
    }

    /// True while any source is still producing
    pub fn any_listening(&self) -> bool {
        self.visual.iter().any(|s| s.is_listening()) || self.bio.iter().any(|s| s.is_listening())
    }

    fn capture_failure(&self) -> Option<(String, String)> {
        self.visual.iter().find_map(|source| {
            source
                .capture_error()
                .map(|reason| (source.name().to_string(), reason))
        })
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
