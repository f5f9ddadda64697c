use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::SourceUnit;
use super::types::{
    Category, Finding, POM_ASSERTION, POM_BLOCKING_DELAY, POM_IO_CLIENT_IMPORT,
    POM_TEST_FRAMEWORK_IMPORT,
};
use super::Detector;

/// Page/component abstractions stay pure: no test-runner imports, no
/// assertions, no blocking delays, no network or database clients. One
/// finding per violated rule, anchored at the first offending line.
pub struct ComponentPurityDetector {
    config: Arc<AuditConfig>,
}

impl ComponentPurityDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }
}

impl Detector for ComponentPurityDetector {
    fn name(&self) -> &'static str {
        "component-purity"
    }

    fn category(&self) -> Category {
        Category::PomCompliance
    }

    fn applies_to(&self, path: &Path) -> bool {
        self.config.in_components_tree(path)
    }

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();

        if let Some(import) = unit
            .imports
            .iter()
            .find(|i| self.config.test_framework_modules.iter().any(|m| m == i.root()))
        {
            findings.push(
                Finding::new(
                    path,
                    &POM_TEST_FRAMEWORK_IMPORT,
                    format!(
                        "component imports test framework `{}`; components must not know their runner",
                        import.module
                    ),
                )
                .at_line(import.line),
            );
        }

        if let Some(&first) = unit.asserts.first() {
            let mut finding = Finding::new(
                path,
                &POM_ASSERTION,
                format!(
                    "component contains {} assert statement(s); return state and let tests assert",
                    unit.asserts.len()
                ),
            )
            .at_line(first);
            if let Some(snippet) = unit.context_snippet(first) {
                finding = finding.with_context(snippet);
            }
            findings.push(finding);
        }

        let delays: Vec<_> = self
            .config
            .blocking_delay_calls
            .iter()
            .flat_map(|target| unit.calls_to(target))
            .collect();
        if let Some(first) = delays.iter().map(|c| c.line).min() {
            findings.push(
                Finding::new(
                    path,
                    &POM_BLOCKING_DELAY,
                    format!(
                        "component calls a blocking delay {} time(s); use the engine's explicit waits",
                        delays.len()
                    ),
                )
                .at_line(first),
            );
        }

        if let Some(import) = unit
            .imports
            .iter()
            .find(|i| self.config.io_client_modules.iter().any(|m| m == i.root()))
        {
            findings.push(
                Finding::new(
                    path,
                    &POM_IO_CLIENT_IMPORT,
                    format!(
                        "component imports I/O client `{}`; move data setup behind a fixture",
                        import.module
                    ),
                )
                .at_line(import.line),
            );
        }

        findings
    }
}
