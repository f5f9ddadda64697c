use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audit::AuditResult;
use crate::error::{ArchAuditError, Result};

const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Watch,
    Commit,
    Ci,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Watch => "watch",
            Trigger::Commit => "commit",
            Trigger::Ci => "ci",
        }
    }

    /// Retention ceiling per trigger type; oldest records evict first.
    pub fn retention(&self) -> usize {
        match self {
            Trigger::Watch => 500,
            Trigger::Commit => 200,
            Trigger::Ci => 200,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compact form of an AuditResult, small enough to keep hundreds of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub passed: bool,
    pub files_scanned: usize,
    pub active_findings: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub file_counts: BTreeMap<String, usize>,
}

impl From<&AuditResult> for ResultSummary {
    fn from(result: &AuditResult) -> Self {
        Self {
            passed: result.passed,
            files_scanned: result.files_scanned,
            active_findings: result.active_count(),
            category_counts: result.category_counts.clone(),
            file_counts: result.file_counts(),
        }
    }
}

/// Append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub trigger: Trigger,
    pub changed_files: Vec<PathBuf>,
    pub summary: ResultSummary,
}

/// JSON-file history with atomic replace-on-write, so a live watcher and a
/// simultaneous commit-time run never interleave records.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            ArchAuditError::Persistence(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let records = serde_json::from_str(&content).map_err(|e| {
            ArchAuditError::Persistence(format!("corrupt history {}: {}", self.path.display(), e))
        })?;
        Ok(records)
    }

    pub fn append(&self, record: HistoryRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        evict(&mut records);
        self.write_atomic(&records)
    }

    fn write_atomic(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ArchAuditError::Persistence(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let payload = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut last_err = None;
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let outcome = fs::write(&tmp, &payload).and_then(|_| fs::rename(&tmp, &self.path));
            match outcome {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "history write attempt {}/{} failed: {}",
                        attempt, MAX_WRITE_ATTEMPTS, e
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(ArchAuditError::Persistence(format!(
            "history write failed after {} attempts: {}",
            MAX_WRITE_ATTEMPTS,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

/// FIFO eviction, independently per trigger type.
fn evict(records: &mut Vec<HistoryRecord>) {
    for trigger in [Trigger::Watch, Trigger::Commit, Trigger::Ci] {
        let count = records.iter().filter(|r| r.trigger == trigger).count();
        let mut excess = count.saturating_sub(trigger.retention());
        if excess == 0 {
            continue;
        }
        records.retain(|r| {
            if r.trigger == trigger && excess > 0 {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(trigger: Trigger, active: usize) -> HistoryRecord {
        HistoryRecord {
            timestamp: Utc::now(),
            trigger,
            changed_files: vec![PathBuf::from("tests/test_a.py")],
            summary: ResultSummary {
                passed: active == 0,
                files_scanned: 10,
                active_findings: active,
                category_counts: BTreeMap::new(),
                file_counts: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn test_append_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("history.json"));

        log.append(record(Trigger::Commit, 2)).unwrap();
        log.append(record(Trigger::Watch, 0)).unwrap();

        let records = log.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].trigger, Trigger::Commit);
        assert_eq!(records[1].trigger, Trigger::Watch);
        assert_eq!(records[0].summary.active_findings, 2);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("history.json"));
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_history_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json at all {").unwrap();
        let log = HistoryLog::new(path);
        assert!(matches!(
            log.load().unwrap_err(),
            ArchAuditError::Persistence(_)
        ));
    }

    #[test]
    fn test_eviction_is_fifo_per_trigger() {
        let mut records: Vec<HistoryRecord> = Vec::new();
        for i in 0..(Trigger::Commit.retention() + 5) {
            records.push(record(Trigger::Commit, i));
        }
        records.push(record(Trigger::Watch, 999));

        evict(&mut records);

        let commits: Vec<&HistoryRecord> = records
            .iter()
            .filter(|r| r.trigger == Trigger::Commit)
            .collect();
        assert_eq!(commits.len(), Trigger::Commit.retention());
        // The oldest five went first.
        assert_eq!(commits[0].summary.active_findings, 5);
        // Other triggers untouched.
        assert_eq!(
            records
                .iter()
                .filter(|r| r.trigger == Trigger::Watch)
                .count(),
            1
        );
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join(".archaudit/history.json"));
        log.append(record(Trigger::Ci, 1)).unwrap();
        assert_eq!(log.load().unwrap().len(), 1);
    }
}
