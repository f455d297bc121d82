//! OutcomeSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{ContractError, SessionOutcome};

/// Outcome output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(OutcomeSink: Send)]
pub trait LocalOutcomeSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one session outcome
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, outcome: &SessionOutcome) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
