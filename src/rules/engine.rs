use std::collections::BTreeSet;

use crate::config::{EngineSpec, EnginesConfig};
use crate::source::SourceUnit;

/// The two mutually exclusive automation engines. Classification is an
/// explicit, exhaustively tested mapping; nothing elsewhere in the crate
/// sniffs engine identity from substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Engine {
    Legacy,
    Modern,
}

impl Engine {
    pub fn spec<'a>(&self, engines: &'a EnginesConfig) -> &'a EngineSpec {
        match self {
            Engine::Legacy => &engines.legacy,
            Engine::Modern => &engines.modern,
        }
    }

    pub fn name<'a>(&self, engines: &'a EnginesConfig) -> &'a str {
        &self.spec(engines).name
    }

    pub fn other(&self) -> Engine {
        match self {
            Engine::Legacy => Engine::Modern,
            Engine::Modern => Engine::Legacy,
        }
    }

    /// Import namespace root -> engine.
    pub fn classify_import(root: &str, engines: &EnginesConfig) -> Option<Engine> {
        if engines.legacy.modules.iter().any(|m| m == root) {
            Some(Engine::Legacy)
        } else if engines.modern.modules.iter().any(|m| m == root) {
            Some(Engine::Modern)
        } else {
            None
        }
    }

    /// Marker label (the `selenium` in `pytest.mark.selenium`) -> engine.
    pub fn classify_marker(label: &str, engines: &EnginesConfig) -> Option<Engine> {
        if label == engines.legacy.marker {
            Some(Engine::Legacy)
        } else if label == engines.modern.marker {
            Some(Engine::Modern)
        } else {
            None
        }
    }

    /// Path segment -> engine promised by the directory layout.
    pub fn classify_folder(segment: &str, engines: &EnginesConfig) -> Option<Engine> {
        if engines.legacy.folders.iter().any(|f| f == segment) {
            Some(Engine::Legacy)
        } else if engines.modern.folders.iter().any(|f| f == segment) {
            Some(Engine::Modern)
        } else {
            None
        }
    }

    /// Engine label out of a full decorator path: `pytest.mark.selenium`
    /// classifies, `pytest.mark.smoke` does not.
    pub fn from_decorator(decorator: &str, engines: &EnginesConfig) -> Option<Engine> {
        let label = decorator.strip_prefix("pytest.mark.")?;
        Engine::classify_marker(label, engines)
    }

    /// Every engine the unit's import table reaches.
    pub fn imported_engines(unit: &SourceUnit, engines: &EnginesConfig) -> BTreeSet<Engine> {
        unit.imports
            .iter()
            .filter_map(|i| Engine::classify_import(i.root(), engines))
            .collect()
    }
}
