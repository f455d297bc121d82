//! FileSink - appends outcomes to a JSON-lines file

use chrono::{SecondsFormat, Utc};
use contracts::{ContractError, OutcomeSink, SessionOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, one JSON object per line
    pub path: PathBuf,
    /// Keep existing lines instead of truncating
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    ///
    /// `path` is required; `append` defaults to true.
    pub fn from_params(params: &HashMap<String, String>) -> std::io::Result<Self> {
        let path = params.get("path").map(PathBuf::from).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing 'path' param")
        })?;
        let append = params
            .get("append")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Ok(Self { path, append })
    }
}

#[derive(Serialize)]
struct OutcomeRecord<'a> {
    recorded_at: String,
    #[serde(flatten)]
    outcome: &'a SessionOutcome,
}

/// Sink that writes one JSON line per session outcome
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)?;
        Self::new(name, config)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    fn append_line(&mut self, outcome: &SessionOutcome) -> std::io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink already closed")
        })?;
        let record = OutcomeRecord {
            recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            outcome,
        };
        serde_json::to_writer(&mut *writer, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")
    }

    fn persist(&mut self, outcome: &SessionOutcome) -> Result<(), ContractError> {
        self.append_line(outcome).map_err(|e| {
            error!(sink = %self.name, session_id = outcome.session_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl OutcomeSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, outcome),
        fields(sink = %self.name, session_id = outcome.session_id)
    )]
    async fn write(&mut self, outcome: &SessionOutcome) -> Result<(), ContractError> {
        self.persist(outcome)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BlinkCounters, BlinkMatch, Outcome, SessionFailure};
    use tempfile::tempdir;

    fn accepted() -> SessionOutcome {
        SessionOutcome {
            session_id: 1,
            outcome: Outcome::Accepted(BlinkMatch {
                visual_timestamp_us: 1_000_000,
                bio_timestamp_us: 1_120_000,
                sample_index: 4_321,
                latency_us: 120_000,
            }),
            counters: BlinkCounters {
                visual_blinks: 1,
                bio_blinks: 1,
                ..Default::default()
            },
        }
    }

    fn timed_out() -> SessionOutcome {
        SessionOutcome {
            session_id: 2,
            outcome: Outcome::Failed {
                failure: SessionFailure::Timeout,
            },
            counters: BlinkCounters::default(),
        }
    }

    #[tokio::test]
    async fn test_file_sink_writes_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("outcomes.jsonl");
        let config = FileSinkConfig {
            path: path.clone(),
            append: true,
        };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.write(&accepted()).await.unwrap();
        sink.write(&timed_out()).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["session_id"], 1);
        assert_eq!(lines[0]["outcome"]["status"], "accepted");
        assert_eq!(lines[0]["outcome"]["sample_index"], 4_321);
        assert!(lines[0]["recorded_at"].is_string());

        assert_eq!(lines[1]["outcome"]["status"], "failed");
        assert_eq!(lines[1]["outcome"]["failure"]["kind"], "timeout");
    }

    #[tokio::test]
    async fn test_file_sink_truncates_without_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        fs::write(&path, "stale\n").unwrap();

        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        params.insert("append".to_string(), "false".to_string());

        let mut sink = FileSink::from_params("fresh", &params).unwrap();
        sink.write(&timed_out()).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(!content.contains("stale"));
    }

    #[tokio::test]
    async fn test_file_sink_rejects_write_after_close() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            path: dir.path().join("o.jsonl"),
            append: true,
        };

        let mut sink = FileSink::new("closed", config).unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(&accepted()).await.is_err());
    }

    #[test]
    fn test_file_sink_requires_path() {
        let params = HashMap::new();
        let err = FileSinkConfig::from_params(&params).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
