use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Ordered so that comparisons read naturally: `Critical > Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Critical => "✗",
            Severity::Error => "✗",
            Severity::Warning => "⚠",
            Severity::Info => "○",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    EngineIsolation,
    Markers,
    Structure,
    PomCompliance,
    TestBoundary,
    ProtectedFlows,
    /// Synthetic findings the orchestrator or ledger produces itself.
    Reserved,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::EngineIsolation => "engine-isolation",
            Category::Markers => "markers",
            Category::Structure => "structure",
            Category::PomCompliance => "pom-compliance",
            Category::TestBoundary => "test-boundary",
            Category::ProtectedFlows => "protected-flows",
            Category::Reserved => "reserved",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "engine-isolation" => Some(Category::EngineIsolation),
            "markers" => Some(Category::Markers),
            "structure" => Some(Category::Structure),
            "pom-compliance" => Some(Category::PomCompliance),
            "test-boundary" => Some(Category::TestBoundary),
            "protected-flows" => Some(Category::ProtectedFlows),
            "reserved" => Some(Category::Reserved),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rule's fixed identity: id, category, and default severity. Every
/// rule_id maps to exactly one spec.
#[derive(Debug)]
pub struct RuleSpec {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub summary: &'static str,
}

pub static ENGINE_MIX: RuleSpec = RuleSpec {
    id: "engine-mix",
    category: Category::EngineIsolation,
    severity: Severity::Critical,
    summary: "legacy and modern automation engines imported in one file",
};

pub static MISSING_ENGINE_MARKER: RuleSpec = RuleSpec {
    id: "missing-engine-marker",
    category: Category::Markers,
    severity: Severity::Error,
    summary: "test construct declares no engine intent marker",
};

pub static MARKER_ENGINE_MISMATCH: RuleSpec = RuleSpec {
    id: "marker-engine-mismatch",
    category: Category::Markers,
    severity: Severity::Critical,
    summary: "engine marker contradicts the imports",
};

pub static FOLDER_ENGINE_MISMATCH: RuleSpec = RuleSpec {
    id: "folder-engine-mismatch",
    category: Category::Structure,
    severity: Severity::Error,
    summary: "file imports a different engine than its folder promises",
};

pub static POM_TEST_FRAMEWORK_IMPORT: RuleSpec = RuleSpec {
    id: "pom-compliance/test-framework-import",
    category: Category::PomCompliance,
    severity: Severity::Error,
    summary: "component imports the test runner's framework",
};

pub static POM_ASSERTION: RuleSpec = RuleSpec {
    id: "pom-compliance/assertion-in-component",
    category: Category::PomCompliance,
    severity: Severity::Error,
    summary: "component contains assert statements",
};

pub static POM_BLOCKING_DELAY: RuleSpec = RuleSpec {
    id: "pom-compliance/blocking-delay",
    category: Category::PomCompliance,
    severity: Severity::Error,
    summary: "component calls a blocking delay",
};

pub static POM_IO_CLIENT_IMPORT: RuleSpec = RuleSpec {
    id: "pom-compliance/io-client-import",
    category: Category::PomCompliance,
    severity: Severity::Error,
    summary: "component imports a network or database client",
};

pub static DIRECT_LOCATOR_IN_TEST: RuleSpec = RuleSpec {
    id: "direct-locator-in-test",
    category: Category::TestBoundary,
    severity: Severity::Warning,
    summary: "test performs element lookups directly",
};

pub static MISPLACED_COMPONENT: RuleSpec = RuleSpec {
    id: "misplaced-component",
    category: Category::Structure,
    severity: Severity::Error,
    summary: "component-like file outside the components root",
};

pub static MISPLACED_TEST: RuleSpec = RuleSpec {
    id: "misplaced-test",
    category: Category::Structure,
    severity: Severity::Error,
    summary: "test-like file outside the tests root",
};

pub static SCRIPT_ENTRYPOINT_IN_TEST: RuleSpec = RuleSpec {
    id: "script-entrypoint-in-test",
    category: Category::Structure,
    severity: Severity::Error,
    summary: "test file carries a run-as-script entry point",
};

pub static PROTECTED_FLOW_TOUCHED: RuleSpec = RuleSpec {
    id: "protected-flow-touched",
    category: Category::ProtectedFlows,
    severity: Severity::Info,
    summary: "protected business flow touched",
};

pub static PARSE_ERROR: RuleSpec = RuleSpec {
    id: "parse-error",
    category: Category::Reserved,
    severity: Severity::Error,
    summary: "file could not be structurally analyzed",
};

pub static EXPIRED_SUPPRESSION: RuleSpec = RuleSpec {
    id: "expired-suppression",
    category: Category::Reserved,
    severity: Severity::Critical,
    summary: "baseline suppression past its expiry date",
};

pub static DETECTOR_FAILURE: RuleSpec = RuleSpec {
    id: "detector-failure",
    category: Category::Reserved,
    severity: Severity::Warning,
    summary: "a detector failed on this file",
};

pub static RULES: &[&RuleSpec] = &[
    &ENGINE_MIX,
    &MISSING_ENGINE_MARKER,
    &MARKER_ENGINE_MISMATCH,
    &FOLDER_ENGINE_MISMATCH,
    &POM_TEST_FRAMEWORK_IMPORT,
    &POM_ASSERTION,
    &POM_BLOCKING_DELAY,
    &POM_IO_CLIENT_IMPORT,
    &DIRECT_LOCATOR_IN_TEST,
    &MISPLACED_COMPONENT,
    &MISPLACED_TEST,
    &SCRIPT_ENTRYPOINT_IN_TEST,
    &PROTECTED_FLOW_TOUCHED,
    &PARSE_ERROR,
    &EXPIRED_SUPPRESSION,
    &DETECTOR_FAILURE,
];

pub fn rule_spec(id: &str) -> Option<&'static RuleSpec> {
    RULES.iter().find(|r| r.id == id).copied()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub file: PathBuf,
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Finding {
    pub fn new(file: impl Into<PathBuf>, rule: &'static RuleSpec, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            rule_id: rule.id.to_string(),
            category: rule.category,
            severity: rule.severity,
            message: message.into(),
            line: None,
            context: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
