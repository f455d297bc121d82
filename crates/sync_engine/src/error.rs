//! Session host error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Event queue full - event dropped
    #[error("event queue full, '{event}' dropped")]
    QueueFull { event: &'static str },

    /// Host task has stopped
    #[error("session host closed")]
    HostClosed,

    /// Host task panicked or was aborted
    #[error("session host task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
