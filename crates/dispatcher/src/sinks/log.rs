//! LogSink - logs outcome summary via tracing

use contracts::{ContractError, Outcome, OutcomeSink, SessionOutcome};
use tracing::{info, instrument, warn};

/// Sink that reports every session outcome through the log
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_outcome(&self, outcome: &SessionOutcome) {
        let counters = &outcome.counters;
        match &outcome.outcome {
            Outcome::Accepted(m) => info!(
                sink = %self.name,
                session_id = outcome.session_id,
                visual_us = m.visual_timestamp_us,
                bio_us = m.bio_timestamp_us,
                sample_index = m.sample_index,
                latency_ms = m.latency_ms(),
                visual_blinks = counters.visual_blinks,
                bio_blinks = counters.bio_blinks,
                "Blink sync accepted"
            ),
            Outcome::Failed { failure } => warn!(
                sink = %self.name,
                session_id = outcome.session_id,
                failure = %failure,
                visual_blinks = counters.visual_blinks,
                bio_blinks = counters.bio_blinks,
                too_early = counters.bio_too_early,
                too_late = counters.bio_too_late,
                "Blink sync failed"
            ),
            Outcome::Cancelled => info!(
                sink = %self.name,
                session_id = outcome.session_id,
                "Blink sync cancelled"
            ),
        }
    }
}

impl OutcomeSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, outcome),
        fields(sink = %self.name, session_id = outcome.session_id)
    )]
    async fn write(&mut self, outcome: &SessionOutcome) -> Result<(), ContractError> {
        self.log_outcome(outcome);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
