//! Source callback to host queue marshalling

use std::sync::Arc;

use contracts::{BioSignal, BioSignalCallback, SyncEvent, TimestampUs, VisualCallback};
use sync_engine::{SessionHandle, SyncError};
use tracing::{trace, warn};

use crate::stats::IngestionMetrics;

/// Queue one report without blocking the source, counting drops
#[inline]
pub fn submit_report(
    handle: &SessionHandle,
    at: TimestampUs,
    event: SyncEvent,
    metrics: &IngestionMetrics,
    source_name: &str,
) {
    metrics.record_received();
    metrics::counter!(
        "blink_sync_ingestion_reports_total",
        "source" => source_name.to_string()
    )
    .increment(1);

    match handle.try_submit_at(at, event) {
        Ok(()) => {
            trace!(source = %source_name, at = at, "report queued");
        }
        Err(SyncError::QueueFull { event }) => {
            metrics.record_dropped();
            metrics::counter!(
                "blink_sync_ingestion_dropped_total",
                "source" => source_name.to_string()
            )
            .increment(1);
            warn!(source = %source_name, event = event, "host queue full, report dropped");
        }
        Err(_) => {
            metrics.record_host_closed();
            trace!(source = %source_name, "host closed, report discarded");
        }
    }
}

pub fn visual_callback(
    handle: SessionHandle,
    metrics: Arc<IngestionMetrics>,
    source_name: String,
) -> VisualCallback {
    Arc::new(move |at, event| {
        submit_report(&handle, at, SyncEvent::Visual(event), &metrics, &source_name);
    })
}

pub fn bio_callback(
    handle: SessionHandle,
    metrics: Arc<IngestionMetrics>,
    source_name: String,
) -> BioSignalCallback {
    Arc::new(move |at, signal| {
        let event = match signal {
            BioSignal::Artifact(artifact) => SyncEvent::Artifact(artifact),
            BioSignal::Quality(sample) => SyncEvent::Quality(sample),
        };
        submit_report(&handle, at, event, &metrics, &source_name);
    })
}
