use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::SourceUnit;
use super::engine::Engine;
use super::types::{Category, Finding, ENGINE_MIX};
use super::Detector;

/// Selenium and Playwright have incompatible waiting and session models;
/// one source unit must never drive both.
pub struct EngineMixDetector {
    config: Arc<AuditConfig>,
}

impl EngineMixDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }
}

impl Detector for EngineMixDetector {
    fn name(&self) -> &'static str {
        "engine-mix"
    }

    fn category(&self) -> Category {
        Category::EngineIsolation
    }

    fn applies_to(&self, _path: &Path) -> bool {
        true
    }

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        let engines = &self.config.engines;
        let found = Engine::imported_engines(unit, engines);
        if !(found.contains(&Engine::Legacy) && found.contains(&Engine::Modern)) {
            return vec![];
        }

        let legacy_line = unit
            .imports
            .iter()
            .find(|i| Engine::classify_import(i.root(), engines) == Some(Engine::Legacy))
            .map(|i| i.line);
        let modern_line = unit
            .imports
            .iter()
            .find(|i| Engine::classify_import(i.root(), engines) == Some(Engine::Modern))
            .map(|i| i.line);
        // The later of the two first-imports is where the mix materializes.
        let line = legacy_line.max(modern_line);

        let mut finding = Finding::new(
            path,
            &ENGINE_MIX,
            format!(
                "file imports both {} and {}; engines must never share a file",
                engines.legacy.name, engines.modern.name
            ),
        );
        if let Some(line) = line {
            finding = finding.at_line(line);
            if let Some(snippet) = unit.context_snippet(line) {
                finding = finding.with_context(snippet);
            }
        }
        vec![finding]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::Severity;
    use crate::source::SourceParser;
    use std::path::PathBuf;

    fn detect(source: &str) -> Vec<Finding> {
        let config = Arc::new(AuditConfig::default());
        let path = PathBuf::from("tests/test_checkout.py");
        let unit = SourceParser::new().parse_source(&path, source).unwrap();
        EngineMixDetector::new(config).detect(&unit, &path)
    }

    #[test]
    fn test_both_engines_exactly_one_critical_finding() {
        let findings = detect(
            "from selenium import webdriver\nfrom selenium.webdriver.common.by import By\nfrom playwright.sync_api import sync_playwright\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "engine-mix");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].line, Some(3));
    }

    #[test]
    fn test_single_engine_clean() {
        assert!(detect("from playwright.sync_api import sync_playwright\n").is_empty());
        assert!(detect("from selenium import webdriver\nimport os\n").is_empty());
    }

    #[test]
    fn test_no_engine_clean() {
        assert!(detect("import os\nimport json\n").is_empty());
    }
}
