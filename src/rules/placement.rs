use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::{CallableKind, SourceUnit};
use super::types::{
    Category, Finding, MISPLACED_COMPONENT, MISPLACED_TEST, SCRIPT_ENTRYPOINT_IN_TEST,
};
use super::Detector;

/// Components live under the components root, tests under the tests root,
/// and a test file never doubles as a runnable script.
pub struct PlacementDetector {
    config: Arc<AuditConfig>,
}

impl PlacementDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }

    fn is_test_like(path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.starts_with("test_") || name.ends_with("_test.py")
    }

    fn component_class_line(unit: &SourceUnit) -> Option<usize> {
        unit.callables
            .iter()
            .find(|c| {
                c.kind == CallableKind::Class
                    && (c.name.ends_with("Page") || c.name.ends_with("Component"))
            })
            .map(|c| c.line)
    }
}

impl Detector for PlacementDetector {
    fn name(&self) -> &'static str {
        "placement"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn applies_to(&self, _path: &Path) -> bool {
        true
    }

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        let mut findings = Vec::new();
        let in_components = self.config.in_components_tree(path);
        let in_tests = self.config.in_tests_tree(path);
        let test_like = Self::is_test_like(path);

        if !in_components {
            if let Some(line) = Self::component_class_line(unit) {
                // A page class inside a test file is boundary breakage, not
                // misplacement; leave that to the purity/boundary rules.
                if !test_like {
                    findings.push(
                        Finding::new(
                            path,
                            &MISPLACED_COMPONENT,
                            format!(
                                "page component defined outside {}/",
                                self.config.components_root.display()
                            ),
                        )
                        .at_line(line),
                    );
                }
            }
        }

        if test_like && !in_tests {
            findings.push(Finding::new(
                path,
                &MISPLACED_TEST,
                format!(
                    "test file sits outside {}/",
                    self.config.tests_root.display()
                ),
            ));
        }

        if (in_tests || test_like) && unit.has_main_guard {
            findings.push(Finding::new(
                path,
                &SCRIPT_ENTRYPOINT_IN_TEST,
                "test file carries an `if __name__ == \"__main__\"` entry point; run it through the test runner",
            ));
        }

        findings
    }
}
