//! Dispatcher - 把会话结果逐个复制给每个 sink

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{SessionOutcome, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// 分发配置：按顺序列出的 sinks
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<SessionOutcome>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<SessionOutcome>) -> Self {
        Self { config, input_rx }
    }

    /// Open every configured sink and start its writer
    ///
    /// Fails on the first sink that cannot be opened; writers already
    /// started for earlier sinks stop once their handles are dropped.
    #[instrument(name = "dispatcher_build", skip(self), fields(sinks = self.config.sinks.len()))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = self
            .config
            .sinks
            .iter()
            .map(open_sink)
            .collect::<Result<Vec<_>, _>>()?;
        info!(sinks = ?handles.iter().map(SinkHandle::name).collect::<Vec<_>>(), "Outcome sinks opened");

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    debug!(
        sink = %config.name,
        sink_type = ?config.sink_type,
        queue_capacity = config.queue_capacity,
        "Sink writer started"
    );
    Ok(handle)
}

/// Consumes the host's outcome channel and copies each outcome to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<SessionOutcome>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<SessionOutcome>,
    ) -> Self {
        Self { handles, input_rx }
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name().to_string()).collect()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run until the outcome channel closes, then drain and close every sink
    ///
    /// Returns the final per-sink metrics, in sink order.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        let mut dispatched: u64 = 0;
        while let Some(outcome) = self.input_rx.recv().await {
            self.dispatch(&outcome).await;
            dispatched += 1;
        }
        info!(dispatched, "Outcome channel closed, closing sinks");

        let mut final_metrics = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = Arc::clone(handle.metrics());
            handle.shutdown().await;
            final_metrics.push((name, metrics.snapshot()));
        }
        final_metrics
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    /// 按配置顺序交给每个 sink；慢 sink 会拖慢后续结果，但不会丢失
    async fn dispatch(&self, outcome: &SessionOutcome) {
        debug!(
            session_id = outcome.session_id,
            outcome = outcome.outcome.label(),
            sinks = self.handles.len(),
            "Dispatching session outcome"
        );
        for handle in &self.handles {
            handle.deliver(outcome.clone()).await;
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<SessionOutcome>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build()
}
