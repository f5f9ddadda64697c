use std::collections::BTreeSet;
use std::path::PathBuf;

/// One `import x` / `from x import y` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted module path as written (`selenium.webdriver.common.by`).
    pub module: String,
    /// Names pulled in by a `from` import; empty for plain `import`.
    pub names: Vec<String>,
    pub alias: Option<String>,
    pub line: usize,
}

impl Import {
    /// Top-level namespace: `selenium.webdriver.common.by` -> `selenium`.
    pub fn root(&self) -> &str {
        self.module.split('.').next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Class,
    Function,
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    /// Dotted path without arguments: `pytest.mark.selenium`.
    pub name: String,
    pub line: usize,
}

/// A class, function, or method definition. `parent` indexes into
/// `SourceUnit::callables`, encoding the nesting tree.
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: String,
    pub kind: CallableKind,
    pub decorators: Vec<Decorator>,
    pub line: usize,
    pub parent: Option<usize>,
}

/// A call expression site. `scope` indexes the enclosing callable, if any.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub callee: String,
    pub line: usize,
    pub scope: Option<usize>,
}

impl CallSite {
    /// Last dotted segment: `self.driver.find_element` -> `find_element`.
    pub fn tail(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }
}

/// Structural view of one audited source file. Immutable once built;
/// recreated per audit pass (the content hash keys incremental reuse).
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub imports: Vec<Import>,
    pub callables: Vec<Callable>,
    pub calls: Vec<CallSite>,
    /// Lines holding bare `assert` statements.
    pub asserts: Vec<usize>,
    /// File ends in an `if __name__ == "__main__"` guard.
    pub has_main_guard: bool,
    pub raw: String,
    pub content_hash: String,
}

impl SourceUnit {
    pub fn imported_roots(&self) -> BTreeSet<&str> {
        self.imports.iter().map(|i| i.root()).collect()
    }

    /// True if any import sits inside the given namespace
    /// (`selenium` matches both `import selenium` and
    /// `from selenium.webdriver import ...`).
    pub fn imports_namespace(&self, namespace: &str) -> bool {
        self.imports.iter().any(|i| {
            i.module == namespace || i.module.starts_with(&format!("{}.", namespace))
        })
    }

    pub fn first_import_of(&self, namespace: &str) -> Option<&Import> {
        self.imports.iter().find(|i| {
            i.module == namespace || i.module.starts_with(&format!("{}.", namespace))
        })
    }

    pub fn calls_to(&self, target: &str) -> Vec<&CallSite> {
        self.calls
            .iter()
            .filter(|c| c.callee == target || c.tail() == target || c.callee.ends_with(&format!(".{}", target)))
            .collect()
    }

    pub fn decorators_of(&self, callable_idx: usize) -> &[Decorator] {
        &self.callables[callable_idx].decorators
    }

    /// Snippet of the raw source around a 1-based line, for finding context.
    pub fn context_snippet(&self, line: usize) -> Option<String> {
        self.raw
            .lines()
            .nth(line.saturating_sub(1))
            .map(|l| l.trim().to_string())
    }
}
