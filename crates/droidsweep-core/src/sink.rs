// ── Result sink and outbound sinks ──
//
// `ResultSink` is the single append point for a run's outcomes. Every
// outcome is also forwarded to a durable `OutcomeLog`; captured artifacts
// go to an `ArtifactStore`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{ActionOutcome, OutcomeStatus, RunReport};

// ── Durable log ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Pass,
    Fail,
    Info,
}

/// One line of the durable log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    fn from_outcome(outcome: &ActionOutcome) -> Self {
        Self {
            timestamp: outcome.timestamp(),
            level: match outcome.status() {
                OutcomeStatus::Passed => LogLevel::Pass,
                OutcomeStatus::Failed => LogLevel::Fail,
            },
            message: format!(
                "[{}] {}: {}",
                outcome.serial(),
                outcome.action(),
                outcome.message()
            ),
        }
    }

    /// `<RFC3339> <LEVEL> <message>`
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

/// Append-only sink for log records.
#[async_trait]
pub trait OutcomeLog: Send + Sync {
    async fn append(&self, record: &LogRecord) -> std::io::Result<()>;
}

/// Appends one line per record to a file.
pub struct FileOutcomeLog {
    path: PathBuf,
    // Serializes appends so lines from concurrent devices never interleave.
    lock: tokio::sync::Mutex<()>,
}

impl FileOutcomeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutcomeLog for FileOutcomeLog {
    async fn append(&self, record: &LogRecord) -> std::io::Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut line = record.to_line();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// Discards every record. Used when no log file is configured.
pub struct NullOutcomeLog;

#[async_trait]
impl OutcomeLog for NullOutcomeLog {
    async fn append(&self, _record: &LogRecord) -> std::io::Result<()> {
        Ok(())
    }
}

// ── Artifacts ────────────────────────────────────────────────────────

/// Persists captured artifacts and returns where they landed.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, CoreError>;
}

/// Writes artifacts into one directory, created on demand.
pub struct DirArtifactStore {
    dir: PathBuf,
}

impl DirArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactStore for DirArtifactStore {
    async fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, CoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(sanitize_file_name(name));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path)
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
///
/// Serials of network devices contain `:` and some USB serials contain
/// other punctuation, neither of which belongs in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "artifact".into()
    } else {
        trimmed.to_owned()
    }
}

// ── ResultSink ───────────────────────────────────────────────────────

/// Collects a run's outcomes in arrival order.
pub struct ResultSink {
    outcomes: Mutex<Vec<ActionOutcome>>,
    log: Arc<dyn OutcomeLog>,
    started_at: DateTime<Utc>,
}

impl ResultSink {
    pub fn new(log: Arc<dyn OutcomeLog>) -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            log,
            started_at: Utc::now(),
        }
    }

    /// Append an outcome and forward it to the durable log. A log failure
    /// is reported but never fails the run.
    pub async fn record(&self, outcome: ActionOutcome) {
        let record = LogRecord::from_outcome(&outcome);
        match self.outcomes.lock() {
            Ok(mut outcomes) => outcomes.push(outcome),
            Err(poisoned) => poisoned.into_inner().push(outcome),
        }
        self.write(&record).await;
    }

    /// Number of outcomes recorded so far.
    pub fn len(&self) -> usize {
        match self.outcomes.lock() {
            Ok(outcomes) => outcomes.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log the summary line and freeze the outcomes into a report.
    pub async fn finish(self, cancelled: bool) -> RunReport {
        let outcomes = self
            .outcomes
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let report = RunReport::new(self.started_at, outcomes, cancelled);

        let mut summary = format!(
            "SUMMARY: PASSED -> {}, FAILED -> {}",
            report.passed(),
            report.failed()
        );
        if cancelled {
            summary.push_str(" (cancelled)");
        }
        let record = LogRecord::info(summary);
        if let Err(e) = self.log.append(&record).await {
            warn!(error = %e, "failed to write run summary to outcome log");
        }
        report
    }

    async fn write(&self, record: &LogRecord) {
        if let Err(e) = self.log.append(record).await {
            warn!(error = %e, "failed to append to outcome log");
        }
    }
}
