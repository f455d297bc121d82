//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 摄像头无法使用
    #[error("capture unavailable on {source_name}: {reason}")]
    CaptureUnavailable {
        /// 数据源名称
        source_name: String,
        /// 失败原因
        reason: String,
    },

    /// 会话宿主已关闭
    #[error("session host closed")]
    HostClosed,
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
