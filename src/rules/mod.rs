mod boundary;
mod engine;
mod engine_mix;
mod folders;
mod markers;
mod placement;
mod protected;
mod purity;
mod types;

use std::path::Path;
use std::sync::Arc;

pub use boundary::TestBoundaryDetector;
pub use engine::Engine;
pub use engine_mix::EngineMixDetector;
pub use folders::FolderConsistencyDetector;
pub use markers::MarkerConsistencyDetector;
pub use placement::PlacementDetector;
pub use protected::ProtectedFlowDetector;
pub use purity::ComponentPurityDetector;
pub use types::{
    rule_spec, Category, Finding, RuleSpec, Severity, DETECTOR_FAILURE, DIRECT_LOCATOR_IN_TEST,
    ENGINE_MIX, EXPIRED_SUPPRESSION, FOLDER_ENGINE_MISMATCH, MARKER_ENGINE_MISMATCH,
    MISPLACED_COMPONENT, MISPLACED_TEST, MISSING_ENGINE_MARKER, PARSE_ERROR, POM_ASSERTION,
    POM_BLOCKING_DELAY, POM_IO_CLIENT_IMPORT, POM_TEST_FRAMEWORK_IMPORT, PROTECTED_FLOW_TOUCHED,
    RULES, SCRIPT_ENTRYPOINT_IN_TEST,
};

use crate::config::AuditConfig;
use crate::source::SourceUnit;

/// One structural rule. Detectors are stateless pure functions over a
/// SourceUnit; they never touch shared mutable state, so the orchestrator
/// is free to run them concurrently.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// The single category this detector's rules belong to; scoped runs
    /// filter on it.
    fn category(&self) -> Category;

    fn applies_to(&self, path: &Path) -> bool;

    fn detect(&self, unit: &SourceUnit, path: &Path) -> Vec<Finding>;
}

/// The fixed detector set, built once at orchestrator initialization and
/// shared read-only between workers.
pub fn default_detectors(config: &Arc<AuditConfig>) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(EngineMixDetector::new(Arc::clone(config))),
        Box::new(MarkerConsistencyDetector::new(Arc::clone(config))),
        Box::new(FolderConsistencyDetector::new(Arc::clone(config))),
        Box::new(ComponentPurityDetector::new(Arc::clone(config))),
        Box::new(TestBoundaryDetector::new(Arc::clone(config))),
        Box::new(PlacementDetector::new(Arc::clone(config))),
        Box::new(ProtectedFlowDetector::new(Arc::clone(config))),
    ]
}
