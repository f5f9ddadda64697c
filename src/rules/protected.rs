use std::path::Path;
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::source::SourceUnit;
use super::types::{Category, Finding, PROTECTED_FLOW_TOUCHED};
use super::Detector;

/// Changes to revenue-critical flows are flagged for human review. Always
/// informational, never blocking.
pub struct ProtectedFlowDetector {
    config: Arc<AuditConfig>,
}

impl ProtectedFlowDetector {
    pub fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }
}

impl Detector for ProtectedFlowDetector {
    fn name(&self) -> &'static str {
        "protected-flows"
    }

    fn category(&self) -> Category {
        Category::ProtectedFlows
    }

    fn applies_to(&self, path: &Path) -> bool {
        self.config.is_protected_flow(path)
    }

    fn detect(&self, _unit: &SourceUnit, path: &Path) -> Vec<Finding> {
        vec![Finding::new(
            path,
            &PROTECTED_FLOW_TOUCHED,
            "file matches a protected-flow pattern; route this change through review",
        )]
    }
}
