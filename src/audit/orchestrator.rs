use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use glob::glob;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, warn};

use crate::config::AuditConfig;
use crate::error::{ArchAuditError, Result};
use crate::ledger::BaselineLedger;
use crate::rules::{default_detectors, Category, Detector, Finding, DETECTOR_FAILURE, PARSE_ERROR};
use crate::source::SourceParser;
use super::result::AuditResult;

#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    /// Restrict the run to one rule category.
    pub category: Option<Category>,
    /// Treat warnings as blocking.
    pub strict: bool,
    /// Audit only these paths (relative to the base) instead of the full
    /// roots; the watcher uses this for scoped re-audits.
    pub paths: Option<Vec<PathBuf>>,
}

/// Owns the immutable detector set and the suppression ledger. The ledger
/// loads at construction: a broken ledger aborts before any detector runs.
pub struct Auditor {
    base: PathBuf,
    config: Arc<AuditConfig>,
    detectors: Arc<Vec<Box<dyn Detector>>>,
    ledger: Arc<BaselineLedger>,
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor")
            .field("base", &self.base)
            .field("config", &self.config)
            .field("detectors", &self.detectors.len())
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl Auditor {
    pub fn new(config: AuditConfig, base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        let ledger = BaselineLedger::load(base.join(&config.baseline))?;
        Ok(Self::with_ledger(config, base, ledger))
    }

    pub fn with_ledger(config: AuditConfig, base: impl Into<PathBuf>, ledger: BaselineLedger) -> Self {
        let config = Arc::new(config);
        let detectors = Arc::new(default_detectors(&config));
        Self {
            base: base.into(),
            config,
            detectors,
            ledger: Arc::new(ledger),
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn ledger(&self) -> &BaselineLedger {
        &self.ledger
    }

    /// Candidate files under the configured roots, exclusions applied,
    /// sorted for reproducible dispatch order.
    pub fn enumerate_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for root in &self.config.roots {
            let pattern = self.base.join(root).join("**/*.py");
            let pattern_str = pattern.to_string_lossy().to_string();
            let matches = glob(&pattern_str)
                .map_err(|e| ArchAuditError::Config(format!("bad root pattern: {}", e)))?;
            for path in matches.filter_map(|r| r.ok()) {
                let rel = path.strip_prefix(&self.base).unwrap_or(&path).to_path_buf();
                if !self.config.is_excluded(&rel) {
                    files.push(rel);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// One full audit pass: enumerate, dispatch detectors per file on a
    /// bounded worker pool, merge deterministically, partition against the
    /// ledger, compute pass/fail.
    pub async fn audit(&self, options: &AuditOptions) -> Result<AuditResult> {
        let files = match &options.paths {
            Some(paths) => {
                let mut scoped: Vec<PathBuf> = paths
                    .iter()
                    .filter(|p| !self.config.is_excluded(p))
                    .cloned()
                    .collect();
                scoped.sort();
                scoped.dedup();
                scoped
            }
            None => self.enumerate_files()?,
        };
        debug!("auditing {} file(s)", files.len());

        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(files.len().max(1));
        let semaphore = Arc::new(Semaphore::new(parallelism));

        let mut handles = Vec::with_capacity(files.len());
        for rel in &files {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| ArchAuditError::Task(e.to_string()))?;
            let detectors = Arc::clone(&self.detectors);
            let abs = self.base.join(rel);
            let rel = rel.clone();
            let category = options.category;
            handles.push(task::spawn_blocking(move || {
                let _permit = permit;
                scan_file(&abs, &rel, &detectors, category)
            }));
        }

        let mut findings = Vec::new();
        for handle in handles {
            let file_findings = handle
                .await
                .map_err(|e| ArchAuditError::Task(format!("worker panicked: {}", e)))?;
            findings.extend(file_findings);
        }

        // Stable sort: ties keep per-detector emission order.
        findings.sort_by(|a, b| (&a.file, &a.rule_id).cmp(&(&b.file, &b.rule_id)));

        let audit_date = Utc::now().date_naive();
        let verdict = self.ledger.partition(findings, audit_date);

        let mut active = verdict.active;
        active.extend(verdict.expired);
        active.sort_by(|a, b| (&a.file, &a.rule_id).cmp(&(&b.file, &b.rule_id)));

        let blocking = self.config.blocking_set(options.strict);
        Ok(AuditResult::build(
            Utc::now(),
            files.len(),
            active,
            verdict.suppressed,
            &blocking,
        ))
    }
}

/// Per-file worker: pure, owns its own parser and SourceUnit, produces
/// purely local findings. Parse failures and detector panics surface as
/// findings, never as errors.
fn scan_file(
    abs: &Path,
    rel: &Path,
    detectors: &[Box<dyn Detector>],
    category: Option<Category>,
) -> Vec<Finding> {
    let parser = SourceParser::new();
    let unit = match parser.parse(abs) {
        Ok(unit) => unit,
        Err(ArchAuditError::Parse { line, message, .. }) => {
            let mut finding = Finding::new(rel, &PARSE_ERROR, message);
            if line > 0 {
                finding = finding.at_line(line);
            }
            return vec![finding];
        }
        Err(other) => {
            return vec![Finding::new(rel, &PARSE_ERROR, other.to_string())];
        }
    };

    let mut findings = Vec::new();
    for detector in detectors {
        if let Some(filter) = category {
            if detector.category() != filter {
                continue;
            }
        }
        if !detector.applies_to(rel) {
            continue;
        }
        match catch_unwind(AssertUnwindSafe(|| detector.detect(&unit, rel))) {
            Ok(detected) => findings.extend(detected),
            Err(_) => {
                warn!("detector {} failed on {}", detector.name(), rel.display());
                findings.push(Finding::new(
                    rel,
                    &DETECTOR_FAILURE,
                    format!("detector {} failed on this file", detector.name()),
                ));
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;
    use crate::source::SourceUnit;
    use std::fs;
    use tempfile::TempDir;

    fn write_tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        dir
    }

    fn auditor(dir: &TempDir) -> Auditor {
        Auditor::new(AuditConfig::default(), dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_clean_tree_passes() {
        let dir = write_tree(&[(
            "tests/playwright/test_search.py",
            "import pytest\nfrom playwright.sync_api import sync_playwright\n\n@pytest.mark.playwright\nclass TestSearch:\n    def test_basic(self):\n        pass\n",
        )]);
        let result = auditor(&dir).audit(&AuditOptions::default()).await.unwrap();
        assert!(result.passed);
        assert!(result.active.is_empty());
        assert_eq!(result.files_scanned, 1);
    }

    #[tokio::test]
    async fn test_engine_mix_fails_run() {
        let dir = write_tree(&[(
            "tests/test_mixed.py",
            "import pytest\nfrom selenium import webdriver\nfrom playwright.sync_api import sync_playwright\n\n@pytest.mark.playwright\ndef test_mixed():\n    pass\n",
        )]);
        let result = auditor(&dir).audit(&AuditOptions::default()).await.unwrap();
        assert!(!result.passed);
        assert!(result.active.iter().any(|f| f.rule_id == "engine-mix"));
    }

    #[tokio::test]
    async fn test_unreadable_syntax_becomes_parse_error_finding() {
        let dir = write_tree(&[("tests/test_broken.py", "x = \"\"\"unterminated\n")]);
        let result = auditor(&dir).audit(&AuditOptions::default()).await.unwrap();
        assert_eq!(result.active.len(), 1);
        assert_eq!(result.active[0].rule_id, "parse-error");
        assert_eq!(result.active[0].severity, Severity::Error);
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_exclusions_respected() {
        let dir = write_tree(&[
            ("tests/__pycache__/test_stale.py", "import selenium\nimport playwright\n"),
            ("tests/test_ok.py", "import pytest\n\n@pytest.mark.selenium\ndef test_ok():\n    pass\n"),
        ]);
        let auditor = auditor(&dir);
        let files = auditor.enumerate_files().unwrap();
        assert_eq!(files.len(), 1);
        let result = auditor.audit(&AuditOptions::default()).await.unwrap();
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_category_filter_scopes_run() {
        let dir = write_tree(&[(
            "pages/cart_page.py",
            "import requests\n\nclass CartPage:\n    def totals(self):\n        assert True\n",
        )]);
        let options = AuditOptions {
            category: Some(Category::PomCompliance),
            ..Default::default()
        };
        let result = auditor(&dir).audit(&options).await.unwrap();
        assert!(!result.active.is_empty());
        assert!(result
            .active
            .iter()
            .all(|f| f.category == Category::PomCompliance));
    }

    #[tokio::test]
    async fn test_idempotent_over_unchanged_tree() {
        let dir = write_tree(&[
            ("tests/test_a.py", "from selenium import webdriver\n\ndef test_a():\n    pass\n"),
            ("pages/a_page.py", "import time\n\nclass APage:\n    def wait(self):\n        time.sleep(1)\n"),
        ]);
        let auditor = auditor(&dir);
        let first = auditor.audit(&AuditOptions::default()).await.unwrap();
        let second = auditor.audit(&AuditOptions::default()).await.unwrap();
        assert_eq!(first.category_counts, second.category_counts);
        assert_eq!(first.severity_counts, second.severity_counts);
        assert_eq!(first.passed, second.passed);
    }

    #[tokio::test]
    async fn test_scoped_paths_audit_only_those_files() {
        let dir = write_tree(&[
            ("tests/test_a.py", "from selenium import webdriver\nfrom playwright.sync_api import expect\n\ndef test_a():\n    pass\n"),
            ("tests/test_b.py", "import pytest\n\n@pytest.mark.selenium\ndef test_b():\n    pass\n"),
        ]);
        let options = AuditOptions {
            paths: Some(vec![PathBuf::from("tests/test_b.py")]),
            ..Default::default()
        };
        let result = auditor(&dir).audit(&options).await.unwrap();
        assert_eq!(result.files_scanned, 1);
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_broken_ledger_aborts_before_scanning() {
        let dir = write_tree(&[
            (
                ".archaudit/baseline.yaml",
                "entries:\n  - file: tests/test_a.py\n    rule: engine-mix\n    reason: pending\n    owner: qa\n    created: 2026-06-01\n",
            ),
            ("tests/test_a.py", "import selenium\nimport playwright\n"),
        ]);
        let err = Auditor::new(AuditConfig::default(), dir.path()).unwrap_err();
        assert!(matches!(err, ArchAuditError::LedgerLoad(_)));
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn category(&self) -> Category {
            Category::Structure
        }
        fn applies_to(&self, _path: &Path) -> bool {
            true
        }
        fn detect(&self, _unit: &SourceUnit, _path: &Path) -> Vec<Finding> {
            panic!("broken rule");
        }
    }

    #[test]
    fn test_detector_panic_contained_as_warning_finding() {
        let dir = write_tree(&[("tests/test_a.py", "import os\n")]);
        let detectors: Vec<Box<dyn Detector>> = vec![Box::new(PanickingDetector)];
        let findings = scan_file(
            &dir.path().join("tests/test_a.py"),
            Path::new("tests/test_a.py"),
            &detectors,
            None,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "detector-failure");
        assert_eq!(findings[0].severity, Severity::Warning);
    }
}
