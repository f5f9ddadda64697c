use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::SourceUnit;
use super::engine::Engine;
use super::types::{Category, Finding, FOLDER_ENGINE_MISMATCH};
use super::Detector;

/// A `selenium/` or `playwright/` subtree promises an engine; files
/// beneath it must import that engine and no other.
pub struct FolderConsistencyDetector {
    config: Arc<AuditConfig>,
}

impl FolderConsistencyDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }

    fn expected_engine(&self, path: &Path) -> Option<Engine> {
        path.components().find_map(|c| {
            c.as_os_str()
                .to_str()
                .and_then(|s| Engine::classify_folder(s, &self.config.engines))
        })
    }
}

impl Detector for FolderConsistencyDetector {
    fn name(&self) -> &'static str {
        "folder-consistency"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn applies_to(&self, path: &Path) -> bool {
        self.expected_engine(path).is_some()
    }

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        let engines = &self.config.engines;
        let Some(expected) = self.expected_engine(path) else {
            return vec![];
        };

        let imported = Engine::imported_engines(unit, engines);
        if imported.is_empty() || imported.contains(&expected) {
            return vec![];
        }

        let actual = imported
            .iter()
            .map(|e| e.name(engines))
            .collect::<Vec<_>>()
            .join(", ");
        let line = unit
            .imports
            .iter()
            .find(|i| Engine::classify_import(i.root(), engines).is_some())
            .map(|i| i.line);

        let mut finding = Finding::new(
            path,
            &FOLDER_ENGINE_MISMATCH,
            format!(
                "file sits in a {} subtree but imports {}",
                expected.name(engines),
                actual
            ),
        );
        if let Some(line) = line {
            finding = finding.at_line(line);
        }
        vec![finding]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceParser;
    use std::path::PathBuf;

    fn detect(path: &str, source: &str) -> Vec<Finding> {
        let config = Arc::new(AuditConfig::default());
        let path = PathBuf::from(path);
        let unit = SourceParser::new().parse_source(&path, source).unwrap();
        let detector = FolderConsistencyDetector::new(config);
        assert!(detector.applies_to(&path) || unit.imports.is_empty());
        detector.detect(&unit, &path)
    }

    #[test]
    fn test_matching_folder_clean() {
        let findings = detect(
            "tests/playwright/test_cart.py",
            "from playwright.sync_api import sync_playwright\n",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_wrong_engine_under_folder_flagged() {
        let findings = detect(
            "tests/playwright/test_cart.py",
            "from selenium import webdriver\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "folder-engine-mismatch");
        assert!(findings[0].message.contains("playwright subtree"));
        assert_eq!(findings[0].line, Some(1));
    }

    #[test]
    fn test_no_engine_imports_clean() {
        let findings = detect("tests/selenium/conftest_helpers.py", "import os\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_neutral_folder_not_applicable() {
        let config = Arc::new(AuditConfig::default());
        let detector = FolderConsistencyDetector::new(config);
        assert!(!detector.applies_to(Path::new("tests/shared/test_misc.py")));
        assert!(detector.applies_to(Path::new("tests/selenium/test_login.py")));
    }
}
