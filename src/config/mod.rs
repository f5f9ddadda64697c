use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{ArchAuditError, Result};
use crate::rules::Severity;

/// One automation engine as the audited codebase sees it: the import
/// namespaces that betray its use, the pytest marker that declares intent,
/// and the directory names that promise it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSpec {
    pub name: String,
    pub modules: Vec<String>,
    pub marker: String,
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginesConfig {
    pub legacy: EngineSpec,
    pub modern: EngineSpec,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            legacy: EngineSpec {
                name: "selenium".to_string(),
                modules: vec!["selenium".to_string()],
                marker: "selenium".to_string(),
                folders: vec!["selenium".to_string()],
            },
            modern: EngineSpec {
                name: "playwright".to_string(),
                modules: vec!["playwright".to_string()],
                marker: "playwright".to_string(),
                folders: vec!["playwright".to_string()],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Poll interval for the mtime scanner, in milliseconds.
    pub poll_ms: u64,
    /// Debounce window: a burst of edits collapses into one audit.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_ms: 500,
            debounce_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Scan roots, relative to the repository root.
    pub roots: Vec<PathBuf>,
    /// Glob patterns excluded from every scan.
    pub exclude: Vec<String>,
    pub engines: EnginesConfig,
    /// Directory holding reusable page/component abstractions.
    pub components_root: PathBuf,
    /// Directory holding the tests themselves.
    pub tests_root: PathBuf,
    /// Filename globs whose changes are always flagged for review.
    pub protected_flows: Vec<String>,
    /// Severities that fail an audit. Strict mode adds `warning` at runtime.
    pub blocking: Vec<Severity>,
    /// Rule categories that do not gate a merge on their own.
    pub non_blocking_categories: Vec<String>,
    /// Test-runner namespaces a component must never import.
    pub test_framework_modules: Vec<String>,
    /// Network/database client namespaces a component must never import.
    pub io_client_modules: Vec<String>,
    /// Call targets that block the thread (forbidden in components).
    pub blocking_delay_calls: Vec<String>,
    /// Element-lookup call targets tests should delegate to components.
    pub locator_calls: Vec<String>,
    pub baseline: PathBuf,
    pub history: PathBuf,
    pub watch: WatchConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("tests"), PathBuf::from("pages")],
            exclude: vec![
                "**/__pycache__/**".to_string(),
                "**/.venv/**".to_string(),
            ],
            engines: EnginesConfig::default(),
            components_root: PathBuf::from("pages"),
            tests_root: PathBuf::from("tests"),
            protected_flows: vec!["*checkout*".to_string(), "*payment*".to_string()],
            blocking: vec![Severity::Critical, Severity::Error],
            non_blocking_categories: vec!["protected-flows".to_string()],
            test_framework_modules: vec![
                "pytest".to_string(),
                "unittest".to_string(),
                "nose".to_string(),
            ],
            io_client_modules: vec![
                "requests".to_string(),
                "httpx".to_string(),
                "urllib3".to_string(),
                "socket".to_string(),
                "sqlalchemy".to_string(),
                "psycopg2".to_string(),
                "pymysql".to_string(),
                "redis".to_string(),
            ],
            blocking_delay_calls: vec!["time.sleep".to_string()],
            locator_calls: vec![
                "find_element".to_string(),
                "find_elements".to_string(),
                "locator".to_string(),
                "query_selector".to_string(),
                "query_selector_all".to_string(),
            ],
            baseline: PathBuf::from(".archaudit/baseline.yaml"),
            history: PathBuf::from(".archaudit/history.json"),
            watch: WatchConfig::default(),
        }
    }
}

impl AuditConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ArchAuditError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AuditConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Missing config file falls back to the canonical Selenium/Playwright
    /// layout; a present-but-broken file is still fatal.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(ArchAuditError::Config("no scan roots configured".to_string()));
        }
        for pattern in self.exclude.iter().chain(self.protected_flows.iter()) {
            Pattern::new(pattern).map_err(|e| {
                ArchAuditError::Config(format!("invalid glob pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    pub fn blocking_set(&self, strict: bool) -> BTreeSet<Severity> {
        let mut set: BTreeSet<Severity> = self.blocking.iter().copied().collect();
        if strict {
            set.insert(Severity::Warning);
        }
        set
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|pattern| {
            Pattern::new(pattern)
                .map(|p| p.matches_path(path))
                .unwrap_or(false)
        })
    }

    fn has_segment(path: &Path, segment: &Path) -> bool {
        let Some(name) = segment.file_name() else {
            return false;
        };
        path.components().any(|c| c.as_os_str() == name)
    }

    pub fn in_components_tree(&self, path: &Path) -> bool {
        Self::has_segment(path, &self.components_root)
    }

    pub fn in_tests_tree(&self, path: &Path) -> bool {
        Self::has_segment(path, &self.tests_root)
    }

    pub fn is_protected_flow(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.protected_flows.iter().any(|pattern| {
            Pattern::new(pattern)
                .map(|p| p.matches(name))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.components_root, PathBuf::from("pages"));
        assert_eq!(config.engines.legacy.name, "selenium");
        assert_eq!(config.engines.modern.name, "playwright");
    }

    #[test]
    fn test_blocking_set_default() {
        let config = AuditConfig::default();
        let set = config.blocking_set(false);
        assert!(set.contains(&Severity::Critical));
        assert!(set.contains(&Severity::Error));
        assert!(!set.contains(&Severity::Warning));
    }

    #[test]
    fn test_blocking_set_strict_adds_warning() {
        let config = AuditConfig::default();
        let set = config.blocking_set(true);
        assert!(set.contains(&Severity::Warning));
        assert!(!set.contains(&Severity::Info));
    }

    #[test]
    fn test_excluded_pycache() {
        let config = AuditConfig::default();
        assert!(config.is_excluded(Path::new("tests/playwright/__pycache__/test_cart.py")));
        assert!(!config.is_excluded(Path::new("tests/playwright/test_cart.py")));
    }

    #[test]
    fn test_tree_membership() {
        let config = AuditConfig::default();
        assert!(config.in_components_tree(Path::new("pages/login_page.py")));
        assert!(config.in_components_tree(Path::new("src/pages/login_page.py")));
        assert!(!config.in_components_tree(Path::new("tests/test_login.py")));
        assert!(config.in_tests_tree(Path::new("tests/playwright/test_login.py")));
    }

    #[test]
    fn test_protected_flow_matching() {
        let config = AuditConfig::default();
        assert!(config.is_protected_flow(Path::new("tests/test_checkout_happy_path.py")));
        assert!(config.is_protected_flow(Path::new("pages/payment_page.py")));
        assert!(!config.is_protected_flow(Path::new("tests/test_search.py")));
    }

    #[test]
    fn test_parse_partial_yaml_keeps_defaults() {
        let yaml = r#"
roots:
  - e2e
components_root: e2e/pages
tests_root: e2e/tests
"#;
        let config: AuditConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("e2e")]);
        assert_eq!(config.components_root, PathBuf::from("e2e/pages"));
        // Untouched sections keep their defaults.
        assert_eq!(config.engines.legacy.name, "selenium");
        assert_eq!(config.watch.debounce_ms, 2000);
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let mut config = AuditConfig::default();
        config.exclude.push("[".to_string());
        assert!(config.validate().is_err());
    }
}
