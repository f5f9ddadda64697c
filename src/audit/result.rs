use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::{Finding, Severity};

/// Pure pass/fail: false iff at least one active finding carries a
/// blocking severity. Suppressed findings never participate.
pub fn passed(active: &[Finding], blocking: &BTreeSet<Severity>) -> bool {
    !active.iter().any(|f| blocking.contains(&f.severity))
}

/// Outcome of one audit pass. Immutable once produced; the history log
/// persists a summarized form of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub timestamp: DateTime<Utc>,
    pub files_scanned: usize,
    pub active: Vec<Finding>,
    pub suppressed: Vec<Finding>,
    /// Active finding counts by category, deterministically ordered.
    pub category_counts: BTreeMap<String, usize>,
    /// Active finding counts by severity.
    pub severity_counts: BTreeMap<String, usize>,
    pub passed: bool,
}

impl AuditResult {
    pub fn build(
        timestamp: DateTime<Utc>,
        files_scanned: usize,
        active: Vec<Finding>,
        suppressed: Vec<Finding>,
        blocking: &BTreeSet<Severity>,
    ) -> Self {
        let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut severity_counts: BTreeMap<String, usize> = BTreeMap::new();
        for finding in &active {
            *category_counts
                .entry(finding.category.as_str().to_string())
                .or_default() += 1;
            *severity_counts
                .entry(finding.severity.as_str().to_string())
                .or_default() += 1;
        }

        let passed = passed(&active, blocking);
        Self {
            timestamp,
            files_scanned,
            active,
            suppressed,
            category_counts,
            severity_counts,
            passed,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active finding counts per file, for the most-violated ranking.
    pub fn file_counts(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for finding in &self.active {
            *counts
                .entry(finding.file.display().to_string())
                .or_default() += 1;
        }
        counts
    }

    pub fn blocking_findings<'a>(
        &'a self,
        blocking: &'a BTreeSet<Severity>,
    ) -> impl Iterator<Item = &'a Finding> {
        self.active.iter().filter(|f| blocking.contains(&f.severity))
    }

    pub fn files_with_findings(&self) -> BTreeSet<PathBuf> {
        self.active.iter().map(|f| f.file.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{rule_spec, DIRECT_LOCATOR_IN_TEST, ENGINE_MIX};

    fn blocking_default() -> BTreeSet<Severity> {
        [Severity::Critical, Severity::Error].into_iter().collect()
    }

    fn finding(file: &str, rule_id: &str) -> Finding {
        Finding::new(file, rule_spec(rule_id).unwrap(), "test finding")
    }

    #[test]
    fn test_passed_with_no_findings() {
        assert!(passed(&[], &blocking_default()));
    }

    #[test]
    fn test_passed_with_only_warnings() {
        let findings = vec![finding("a.py", "direct-locator-in-test")];
        assert!(passed(&findings, &blocking_default()));
    }

    #[test]
    fn test_failed_with_one_error() {
        let findings = vec![finding("a.py", "misplaced-test")];
        assert!(!passed(&findings, &blocking_default()));
    }

    #[test]
    fn test_strict_blocking_set_fails_on_warning() {
        let mut blocking = blocking_default();
        blocking.insert(Severity::Warning);
        let findings = vec![finding("a.py", "direct-locator-in-test")];
        assert!(!passed(&findings, &blocking));
    }

    #[test]
    fn test_thousand_warnings_one_critical_fails() {
        let mut findings: Vec<Finding> = (0..1000)
            .map(|i| {
                Finding::new(
                    format!("tests/test_{}.py", i),
                    &DIRECT_LOCATOR_IN_TEST,
                    "direct lookup",
                )
            })
            .collect();
        findings.push(Finding::new("tests/test_mix.py", &ENGINE_MIX, "both engines"));

        let result = AuditResult::build(
            Utc::now(),
            1001,
            findings,
            vec![],
            &blocking_default(),
        );
        assert!(!result.passed);
        assert_eq!(result.severity_counts.get("warning"), Some(&1000));
        assert_eq!(result.severity_counts.get("critical"), Some(&1));
    }

    #[test]
    fn test_passed_ignores_suppressed() {
        let suppressed = vec![finding("a.py", "engine-mix")];
        let result = AuditResult::build(Utc::now(), 1, vec![], suppressed, &blocking_default());
        assert!(result.passed);
        assert!(result.category_counts.is_empty());
    }

    #[test]
    fn test_counts_by_category_and_severity() {
        let findings = vec![
            finding("a.py", "engine-mix"),
            finding("b.py", "engine-mix"),
            finding("c.py", "direct-locator-in-test"),
        ];
        let result = AuditResult::build(Utc::now(), 3, findings, vec![], &blocking_default());
        assert_eq!(result.category_counts.get("engine-isolation"), Some(&2));
        assert_eq!(result.category_counts.get("test-boundary"), Some(&1));
        assert_eq!(result.severity_counts.get("critical"), Some(&2));
        assert!(!result.passed);
    }

    #[test]
    fn test_file_counts_ranking_input() {
        let findings = vec![
            finding("a.py", "engine-mix"),
            finding("a.py", "misplaced-test"),
            finding("b.py", "engine-mix"),
        ];
        let result = AuditResult::build(Utc::now(), 2, findings, vec![], &blocking_default());
        assert_eq!(result.file_counts().get("a.py"), Some(&2));
        assert_eq!(result.file_counts().get("b.py"), Some(&1));
    }

    #[test]
    fn test_serde_round_trip_preserves_counts() {
        let findings = vec![finding("a.py", "engine-mix")];
        let result = AuditResult::build(Utc::now(), 1, findings, vec![], &blocking_default());
        let json = serde_json::to_string(&result).unwrap();
        let back: AuditResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.category_counts, result.category_counts);
        assert_eq!(back.passed, result.passed);
    }
}
