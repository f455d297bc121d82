//! Run statistics and summary printing.

use std::time::Duration;

use contracts::{Outcome, SessionOutcome};
use observability::OutcomeSummary;
use sync_engine::HostStats;

/// Statistics from one scenario run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub scenario: String,

    /// Wall time from start to full shutdown
    pub duration: Duration,

    /// Every outcome the host emitted, in order
    pub outcomes: Vec<SessionOutcome>,

    pub summary: OutcomeSummary,

    pub host: HostStats,

    /// Source reports marshalled into the host queue
    pub ingestion: ingestion::MetricsSnapshot,

    /// Per-sink delivery counters
    pub sinks: Vec<(String, dispatcher::MetricsSnapshot)>,

    /// No outcome arrived within the wait budget
    pub timed_out: bool,

    /// Stopped by Ctrl+C / SIGTERM
    pub interrupted: bool,
}

impl RunStats {
    /// The outcome of the scenario's session, if one was emitted
    pub fn final_outcome(&self) -> Option<&SessionOutcome> {
        self.outcomes.last()
    }

    pub fn accepted(&self) -> bool {
        self.final_outcome()
            .is_some_and(|o| o.outcome.is_accepted())
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Blink Sync Session                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Scenario: {}", self.scenario);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Reports received: {}", self.ingestion.reports_received);
        println!("   ├─ Reports dropped: {}", self.ingestion.reports_dropped);
        println!("   ├─ Events processed: {}", self.host.events_processed);
        println!(
            "   └─ Timers: {} scheduled, {} cancelled, {} stale",
            self.host.timers_scheduled, self.host.timers_cancelled, self.host.stale_timers
        );

        println!("\n🎯 Outcome");
        match self.final_outcome() {
            Some(outcome) => match &outcome.outcome {
                Outcome::Accepted(m) => {
                    println!("   ├─ Accepted (session {})", outcome.session_id);
                    println!("   ├─ Visual blink: {} us", m.visual_timestamp_us);
                    println!("   ├─ Device blink: {} us", m.bio_timestamp_us);
                    println!("   ├─ Latency: {} ms", m.latency_ms());
                    println!("   └─ EEG sample index: {}", m.sample_index);
                }
                Outcome::Failed { failure } => {
                    println!("   └─ Failed (session {}): {}", outcome.session_id, failure);
                }
                Outcome::Cancelled => {
                    println!("   └─ Cancelled (session {})", outcome.session_id);
                }
            },
            None => println!("   └─ No outcome"),
        }
        if self.timed_out {
            println!("   ⚠ wait budget exhausted, session was cancelled on shutdown");
        }
        if self.interrupted {
            println!("   ⚠ interrupted, session was cancelled on shutdown");
        }

        println!("\n📈 Aggregate");
        for line in self.summary.to_string().lines().skip(1) {
            println!("   {}", line);
        }

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            let last = self.sinks.len() - 1;
            for (idx, (name, snap)) in self.sinks.iter().enumerate() {
                let branch = if idx == last { "└─" } else { "├─" };
                println!(
                    "   {} {}: written={} failed={} dropped={}",
                    branch, name, snap.write_count, snap.failure_count, snap.dropped_count
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BlinkCounters, BlinkMatch, SessionFailure};

    fn outcome(outcome: Outcome) -> SessionOutcome {
        SessionOutcome {
            session_id: 1,
            outcome,
            counters: BlinkCounters::default(),
        }
    }

    #[test]
    fn test_final_outcome_is_last() {
        let stats = RunStats {
            outcomes: vec![
                outcome(Outcome::Failed {
                    failure: SessionFailure::Timeout,
                }),
                outcome(Outcome::Accepted(BlinkMatch {
                    visual_timestamp_us: 0,
                    bio_timestamp_us: 100_000,
                    sample_index: 25,
                    latency_us: 100_000,
                })),
            ],
            ..Default::default()
        };
        assert!(stats.accepted());
        assert_eq!(stats.final_outcome().map(|o| o.session_id), Some(1));
    }

    #[test]
    fn test_empty_run_not_accepted() {
        let stats = RunStats::default();
        assert!(!stats.accepted());
        assert!(stats.final_outcome().is_none());
    }
}
