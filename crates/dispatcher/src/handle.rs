//! SinkHandle - 每个 sink 独占一个有界队列和一个写入任务
//!
//! 会话结果是 sink 的唯一记录，队列满时 `deliver` 等待而不是丢弃。

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use contracts::{OutcomeSink, SessionOutcome};

use crate::metrics::SinkMetrics;

pub struct SinkHandle {
    name: String,
    outcome_tx: mpsc::Sender<SessionOutcome>,
    metrics: Arc<SinkMetrics>,
    writer: JoinHandle<()>,
}

impl SinkHandle {
    /// 启动 `sink` 的写入任务
    pub fn spawn<S: OutcomeSink + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (outcome_tx, outcome_rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let writer = tokio::spawn(write_outcomes(
            sink,
            outcome_rx,
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            name,
            outcome_tx,
            metrics,
            writer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand an outcome to the sink, waiting for queue space
    ///
    /// Returns false only if the writer task is gone; the outcome is then
    /// counted as dropped.
    pub async fn deliver(&self, outcome: SessionOutcome) -> bool {
        let session_id = outcome.session_id;
        let label = outcome.outcome.label();
        if self.outcome_tx.send(outcome).await.is_err() {
            self.metrics.inc_dropped_count();
            error!(
                sink = %self.name,
                session_id,
                outcome = label,
                "Sink writer stopped, outcome lost"
            );
            return false;
        }
        let queued = self.outcome_tx.max_capacity() - self.outcome_tx.capacity();
        self.metrics.set_queue_len(queued);
        trace!(sink = %self.name, session_id, queued, "Outcome queued");
        true
    }

    /// 关闭队列，等写入任务写完剩余结果并关闭 sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.outcome_tx);
        if let Err(e) = self.writer.await {
            error!(sink = %self.name, error = ?e, "Sink writer panicked");
        }
        debug!(sink = %self.name, "Sink handle closed");
    }
}

#[instrument(name = "sink_write_outcomes", skip(sink, outcome_rx, metrics), fields(sink = %name))]
async fn write_outcomes<S: OutcomeSink>(
    mut sink: S,
    mut outcome_rx: mpsc::Receiver<SessionOutcome>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    while let Some(outcome) = outcome_rx.recv().await {
        metrics.set_queue_len(outcome_rx.len());
        match sink.write(&outcome).await {
            Ok(()) => metrics.inc_write_count(),
            // 写失败只记账，继续处理后续会话
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    session_id = outcome.session_id,
                    outcome = outcome.outcome.label(),
                    error = %e,
                    "Outcome write failed"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on close");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed");
    }
    debug!(sink = %name, written = metrics.write_count(), "Sink writer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BlinkCounters, ContractError, Outcome};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    struct RecordingSink {
        name: String,
        written: Arc<AtomicU64>,
        closed: Arc<AtomicU64>,
        fail_writes: bool,
        write_delay: Duration,
    }

    impl RecordingSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                written: Arc::new(AtomicU64::new(0)),
                closed: Arc::new(AtomicU64::new(0)),
                fail_writes: false,
                write_delay: Duration::ZERO,
            }
        }
    }

    impl OutcomeSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _outcome: &SessionOutcome) -> Result<(), ContractError> {
            if !self.write_delay.is_zero() {
                sleep(self.write_delay).await;
            }
            if self.fail_writes {
                return Err(ContractError::sink_write(&self.name, "disk gone"));
            }
            self.written.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn cancelled(session_id: u64) -> SessionOutcome {
        SessionOutcome {
            session_id,
            outcome: Outcome::Cancelled,
            counters: BlinkCounters::default(),
        }
    }

    #[tokio::test]
    async fn test_deliver_then_shutdown_writes_and_closes() {
        let sink = RecordingSink::new("record");
        let written = Arc::clone(&sink.written);
        let closed = Arc::clone(&sink.closed);

        let handle = SinkHandle::spawn(sink, 10);
        for i in 1..=5 {
            assert!(handle.deliver(cancelled(i)).await);
        }

        handle.shutdown().await;
        assert_eq!(written.load(Ordering::Relaxed), 5);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sink_applies_backpressure_instead_of_dropping() {
        let mut sink = RecordingSink::new("slow");
        sink.write_delay = Duration::from_millis(100);
        let written = Arc::clone(&sink.written);

        let handle = SinkHandle::spawn(sink, 1);
        for i in 1..=5 {
            assert!(handle.deliver(cancelled(i)).await);
        }
        assert_eq!(handle.metrics().dropped_count(), 0);

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(written.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.write_count(), 5);
        assert_eq!(metrics.dropped_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failures_are_counted_and_do_not_stop_writer() {
        let mut sink = RecordingSink::new("failing");
        sink.fail_writes = true;
        let closed = Arc::clone(&sink.closed);

        let handle = SinkHandle::spawn(sink, 10);
        for i in 1..=3 {
            assert!(handle.deliver(cancelled(i)).await);
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(metrics.failure_count(), 3);
        assert_eq!(metrics.write_count(), 0);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }
}
