//! Per-table attempt records and run-level reporting.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::traits::ResultSink;
use crate::error::Result;

/// Final outcome for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

/// One record per attempted table. Exactly one of these is emitted per
/// table regardless of how many retries it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub table: String,
    pub outcome: Outcome,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub source_rows: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_rows: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub records: Vec<AttemptRecord>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: AttemptRecord) {
        match record.outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
        self.records.push(record);
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }
}

/// In-memory sink with a shared handle, for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stays valid after the sink is moved into the workflow.
    pub fn handle(&self) -> Arc<Mutex<Vec<AttemptRecord>>> {
        Arc::clone(&self.records)
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, record: &AttemptRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| std::io::Error::other("result sink poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

/// Appends records to per-outcome YAML files under a logs directory.
///
/// Files are suffixed with the run id so consecutive runs never clobber
/// each other: `succeeded_tables_2026-08-30_10-00-00.yml`.
pub struct YamlSink {
    logs_dir: PathBuf,
    run_id: String,
}

impl YamlSink {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            run_id: Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn path_for(&self, outcome: Outcome) -> PathBuf {
        let name = match outcome {
            Outcome::Succeeded => format!("succeeded_tables_{}.yml", self.run_id),
            Outcome::Failed | Outcome::Skipped => format!("failed_tables_{}.yml", self.run_id),
        };
        self.logs_dir.join(name)
    }
}

impl ResultSink for YamlSink {
    fn record(&mut self, record: &AttemptRecord) -> Result<()> {
        fs::create_dir_all(&self.logs_dir)?;
        let path = self.path_for(record.outcome);
        let mut existing: Vec<AttemptRecord> = match fs::read_to_string(&path) {
            Ok(text) => serde_yaml::from_str(&text)?,
            Err(_) => Vec::new(),
        };
        existing.push(record.clone());
        fs::write(&path, serde_yaml::to_string(&existing)?)?;
        info!(table = %record.table, path = %path.display(), "recorded attempt");
        Ok(())
    }
}

/// Write the dry-run plan for the whole run as YAML.
pub fn write_plan_file<T: Serialize>(path: &Path, plan: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(plan)?)?;
    info!(path = %path.display(), "wrote plan file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(table: &str, outcome: Outcome) -> AttemptRecord {
        let now = Utc::now();
        AttemptRecord {
            table: table.to_string(),
            outcome,
            attempts: 1,
            started_at: now,
            completed_at: now,
            source_rows: 10,
            loaded_rows: Some(10),
            error: None,
        }
    }

    #[test]
    fn test_run_report_tallies() {
        let mut report = RunReport::default();
        report.push(record("a", Outcome::Succeeded));
        report.push(record("b", Outcome::Failed));
        report.push(record("c", Outcome::Skipped));
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_memory_sink_handle_sees_records() {
        let mut sink = MemorySink::new();
        let handle = sink.handle();
        sink.record(&record("a", Outcome::Succeeded)).unwrap();
        assert_eq!(handle.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_yaml_sink_appends_per_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = YamlSink::new(dir.path());
        sink.record(&record("a", Outcome::Succeeded)).unwrap();
        sink.record(&record("b", Outcome::Succeeded)).unwrap();
        sink.record(&record("c", Outcome::Failed)).unwrap();

        let ok_path = dir
            .path()
            .join(format!("succeeded_tables_{}.yml", sink.run_id()));
        let ok: Vec<AttemptRecord> =
            serde_yaml::from_str(&fs::read_to_string(ok_path).unwrap()).unwrap();
        assert_eq!(ok.len(), 2);

        let bad_path = dir
            .path()
            .join(format!("failed_tables_{}.yml", sink.run_id()));
        let bad: Vec<AttemptRecord> =
            serde_yaml::from_str(&fs::read_to_string(bad_path).unwrap()).unwrap();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].outcome, Outcome::Failed);
    }
}
