use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::SourceUnit;
use super::types::{Category, Finding, DIRECT_LOCATOR_IN_TEST};
use super::Detector;

/// Tests should talk to page components, not to raw element-lookup APIs.
pub struct TestBoundaryDetector {
    config: Arc<AuditConfig>,
}

impl TestBoundaryDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }
}

impl Detector for TestBoundaryDetector {
    fn name(&self) -> &'static str {
        "test-boundary"
    }

    fn category(&self) -> Category {
        Category::TestBoundary
    }

    fn applies_to(&self, path: &Path) -> bool {
        self.config.in_tests_tree(path)
    }

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        let lookups: Vec<_> = unit
            .calls
            .iter()
            .filter(|c| self.config.locator_calls.iter().any(|t| t == c.tail()))
            .collect();

        let Some(first) = lookups.iter().map(|c| c.line).min() else {
            return vec![];
        };

        let mut finding = Finding::new(
            path,
            &DIRECT_LOCATOR_IN_TEST,
            format!(
                "test performs {} direct element lookup(s); delegate to a page component",
                lookups.len()
            ),
        )
        .at_line(first);
        if let Some(snippet) = unit.context_snippet(first) {
            finding = finding.with_context(snippet);
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
        let path = PathBuf::from("tests/test_search.py");
        let unit = SourceParser::new().parse_source(&path, source).unwrap();
        TestBoundaryDetector::new(config).detect(&unit, &path)
    }

    #[test]
    fn test_direct_lookup_is_warning() {
        let findings = detect(
            "\
def test_search(driver):
    driver.find_element(By.ID, 'q').send_keys('rust')
    driver.find_elements(By.CLASS_NAME, 'result')
",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "direct-locator-in-test");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].line, Some(2));
        assert!(findings[0].message.contains("2 direct"));
    }

    #[test]
    fn test_component_delegation_clean() {
        let findings = detect(
            "\
def test_search(search_page):
    search_page.search('rust')
    assert search_page.result_count() > 0
",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_playwright_locator_counts() {
        let findings = detect("def test_nav(page):\n    page.locator('#nav').click()\n");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_not_applicable_outside_tests() {
        let config = Arc::new(AuditConfig::default());
        let detector = TestBoundaryDetector::new(config);
        assert!(!detector.applies_to(Path::new("pages/search_page.py")));
    }
}
