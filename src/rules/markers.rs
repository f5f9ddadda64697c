use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::{Callable, CallableKind, SourceUnit};
use super::engine::Engine;
use super::types::{Category, Finding, MARKER_ENGINE_MISMATCH, MISSING_ENGINE_MARKER};
use super::Detector;

/// Every test construct must declare which engine it targets, and the
/// declaration must agree with what the file actually imports.
pub struct MarkerConsistencyDetector {
    config: Arc<AuditConfig>,
}

impl MarkerConsistencyDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }

    fn is_test_construct(callable: &Callable) -> bool {
        match callable.kind {
            CallableKind::Class => callable.name.starts_with("Test"),
            CallableKind::Function => callable.name.starts_with("test_"),
            CallableKind::Method => false,
        }
    }
}

impl Detector for MarkerConsistencyDetector {
    fn name(&self) -> &'static str {
        "marker-consistency"
    }

    fn category(&self) -> Category {
        Category::Markers
    }

    fn applies_to(&self, path: &Path) -> bool {
        self.config.in_tests_tree(path)
    }

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        let engines = &self.config.engines;
        let imported = Engine::imported_engines(unit, engines);
        let mut findings = Vec::new();

        for callable in unit.callables.iter().filter(|c| Self::is_test_construct(c)) {
            let declared: Vec<Engine> = callable
                .decorators
                .iter()
                .filter_map(|d| Engine::from_decorator(&d.name, engines))
                .collect();

            if declared.is_empty() {
                findings.push(
                    Finding::new(
                        path,
                        &MISSING_ENGINE_MARKER,
                        format!(
                            "{} declares no engine marker; add @pytest.mark.{} or @pytest.mark.{}",
                            callable.name, engines.legacy.marker, engines.modern.marker
                        ),
                    )
                    .at_line(callable.line),
                );
                continue;
            }

            for engine in declared {
                if !imported.is_empty() && !imported.contains(&engine) {
                    let actual = imported
                        .iter()
                        .map(|e| e.name(engines))
                        .collect::<Vec<_>>()
                        .join(", ");
                    findings.push(
                        Finding::new(
                            path,
                            &MARKER_ENGINE_MISMATCH,
                            format!(
                                "{} is marked @pytest.mark.{} but the file imports {}",
                                callable.name,
                                engine.spec(engines).marker,
                                actual
                            ),
                        )
                        .at_line(callable.line),
                    );
                }
            }
        }

        findings
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
        let path = PathBuf::from("tests/playwright/test_cart.py");
        let unit = SourceParser::new().parse_source(&path, source).unwrap();
        MarkerConsistencyDetector::new(config).detect(&unit, &path)
    }

    #[test]
    fn test_marked_and_consistent_clean() {
        let findings = detect(
            "\
import pytest
from playwright.sync_api import sync_playwright

@pytest.mark.playwright
class TestCart:
    def test_add_item(self):
        pass
",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_unmarked_class_flagged() {
        let findings = detect(
            "\
from playwright.sync_api import sync_playwright

class TestCart:
    def test_add_item(self):
        pass
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "missing-engine-marker");
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].line, Some(3));
    }

    #[test]
    fn test_marker_contradicting_imports_is_critical() {
        let findings = detect(
            "\
import pytest
from selenium import webdriver

@pytest.mark.playwright
class TestCart:
    def test_add_item(self):
        pass
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "marker-engine-mismatch");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].message.contains("selenium"));
    }

    #[test]
    fn test_unmarked_top_level_test_function_flagged() {
        let findings = detect("def test_standalone():\n    pass\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "missing-engine-marker");
    }

    #[test]
    fn test_marked_function_without_engine_imports_clean() {
        // A marked test that drives no engine directly (pure fixture use)
        // cannot contradict anything.
        let findings = detect(
            "\
import pytest

@pytest.mark.selenium
def test_smoke(login_page):
    pass
",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_non_engine_markers_do_not_count() {
        let findings = detect(
            "\
import pytest

@pytest.mark.smoke
def test_misc():
    pass
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "missing-engine-marker");
    }

    #[test]
    fn test_helper_methods_not_test_constructs() {
        let findings = detect("def build_fixture():\n    pass\n");
        assert!(findings.is_empty());
    }
}
