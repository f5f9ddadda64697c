use std::fs;
use std::path::Path;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{ArchAuditError, Result};
use super::unit::{CallSite, Callable, CallableKind, Decorator, Import, SourceUnit};

/// Keywords that look like call targets to the extraction regex but are
/// statement syntax.
const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "elif", "while", "for", "return", "yield", "not", "and", "or", "in",
    "is", "with", "assert", "lambda", "del", "match", "case", "except", "class",
    "def",
];

enum StrState {
    Code,
    Triple(char),
}

/// Structural scanner for Python sources. Extracts imports, class/def
/// nesting, decorators, call expressions, assert statements, and the
/// `__main__` guard without interpreting the code. String and comment
/// content is dropped before any token matching; escape sequences inside
/// string literals are not honored.
pub struct SourceParser {
    def_re: Regex,
    class_re: Regex,
    decorator_re: Regex,
    from_import_re: Regex,
    call_re: Regex,
}

impl SourceParser {
    pub fn new() -> Self {
        Self {
            def_re: Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)").unwrap(),
            class_re: Regex::new(r"^class\s+([A-Za-z_]\w*)").unwrap(),
            decorator_re: Regex::new(r"^@\s*([A-Za-z_][\w\.]*)").unwrap(),
            from_import_re: Regex::new(r"^from\s+([\w\.]+)\s+import\s+(.+)$").unwrap(),
            call_re: Regex::new(r"([A-Za-z_][\w\.]*)\s*\(").unwrap(),
        }
    }

    pub fn parse(&self, path: impl AsRef<Path>) -> Result<SourceUnit> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ArchAuditError::Parse {
            path: path.to_path_buf(),
            line: 0,
            message: format!("cannot read file: {}", e),
        })?;
        self.parse_source(path, &content)
    }

    pub fn parse_source(&self, path: impl AsRef<Path>, content: &str) -> Result<SourceUnit> {
        let path = path.as_ref();

        let mut imports: Vec<Import> = Vec::new();
        let mut callables: Vec<Callable> = Vec::new();
        let mut calls: Vec<CallSite> = Vec::new();
        let mut asserts: Vec<usize> = Vec::new();
        let mut has_main_guard = false;

        let mut state = StrState::Code;
        let mut triple_open_line = 0usize;
        let mut pending_decorators: Vec<Decorator> = Vec::new();
        // (module, accumulated names, line) for a parenthesized from-import
        // spanning multiple lines.
        let mut pending_from: Option<(String, String, usize)> = None;
        // (indent of the def/class line, callable index)
        let mut scope_stack: Vec<(usize, usize)> = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line_no = idx + 1;

            let was_code = matches!(state, StrState::Code);
            let code = strip_line(raw_line, &mut state);
            if was_code && matches!(state, StrState::Triple(_)) {
                triple_open_line = line_no;
            }

            let trimmed = code.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some((module, mut names_buf, start_line)) = pending_from.take() {
                names_buf.push(' ');
                names_buf.push_str(trimmed);
                if names_buf.contains(')') {
                    imports.push(Import {
                        module,
                        names: split_import_names(&names_buf),
                        alias: None,
                        line: start_line,
                    });
                } else {
                    pending_from = Some((module, names_buf, start_line));
                }
                continue;
            }

            let indent = leading_indent(&code);
            if has_mixed_indent(&code) {
                return Err(ArchAuditError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: "inconsistent indentation: tabs and spaces mixed".to_string(),
                });
            }

            while let Some(&(scope_indent, _)) = scope_stack.last() {
                if indent <= scope_indent {
                    scope_stack.pop();
                } else {
                    break;
                }
            }
            let current_scope = scope_stack.last().map(|&(_, i)| i);

            if let Some(caps) = self.decorator_re.captures(trimmed) {
                pending_decorators.push(Decorator {
                    name: caps[1].to_string(),
                    line: line_no,
                });
                continue;
            }

            if let Some(caps) = self.class_re.captures(trimmed) {
                let idx = callables.len();
                callables.push(Callable {
                    name: caps[1].to_string(),
                    kind: CallableKind::Class,
                    decorators: std::mem::take(&mut pending_decorators),
                    line: line_no,
                    parent: current_scope,
                });
                scope_stack.push((indent, idx));
                continue;
            }

            if let Some(caps) = self.def_re.captures(trimmed) {
                let kind = match current_scope.map(|i| callables[i].kind) {
                    Some(CallableKind::Class) => CallableKind::Method,
                    _ => CallableKind::Function,
                };
                let idx = callables.len();
                callables.push(Callable {
                    name: caps[1].to_string(),
                    kind,
                    decorators: std::mem::take(&mut pending_decorators),
                    line: line_no,
                    parent: current_scope,
                });
                scope_stack.push((indent, idx));
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("import ") {
                for item in rest.split(',') {
                    let item = item.trim();
                    if item.is_empty() {
                        continue;
                    }
                    let (module, alias) = split_alias(item);
                    imports.push(Import {
                        module,
                        names: vec![],
                        alias,
                        line: line_no,
                    });
                }
                continue;
            }

            if let Some(caps) = self.from_import_re.captures(trimmed) {
                let module = caps[1].to_string();
                let names_part = caps[2].to_string();
                if names_part.contains('(') && !names_part.contains(')') {
                    pending_from = Some((module, names_part, line_no));
                } else {
                    imports.push(Import {
                        module,
                        names: split_import_names(&names_part),
                        alias: None,
                        line: line_no,
                    });
                }
                continue;
            }

            if trimmed == "assert" || trimmed.starts_with("assert ") || trimmed.starts_with("assert(") {
                asserts.push(line_no);
            }

            // The "__main__" literal sits inside a string, which strip_line
            // drops, so the content check reads the raw line.
            if trimmed.starts_with("if __name__") && raw_line.contains("__main__") {
                has_main_guard = true;
                continue;
            }

            for caps in self.call_re.captures_iter(trimmed) {
                let callee = caps[1].to_string();
                let head = callee.split('.').next().unwrap_or("");
                if NON_CALL_KEYWORDS.contains(&head) {
                    continue;
                }
                calls.push(CallSite {
                    callee,
                    line: line_no,
                    scope: current_scope,
                });
            }
        }

        if let StrState::Triple(_) = state {
            return Err(ArchAuditError::Parse {
                path: path.to_path_buf(),
                line: triple_open_line,
                message: "unterminated triple-quoted string".to_string(),
            });
        }

        Ok(SourceUnit {
            path: path.to_path_buf(),
            imports,
            callables,
            calls,
            asserts,
            has_main_guard,
            raw: content.to_string(),
            content_hash: sha256_hex(content),
        })
    }
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::new()
    }
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn leading_indent(code: &str) -> usize {
    code.len() - code.trim_start().len()
}

fn has_mixed_indent(code: &str) -> bool {
    let ws: &str = &code[..leading_indent(code)];
    ws.contains('\t') && ws.contains(' ')
}

/// `"selenium.webdriver as wd"` -> (`selenium.webdriver`, Some(`wd`))
fn split_alias(item: &str) -> (String, Option<String>) {
    match item.split_once(" as ") {
        Some((module, alias)) => (module.trim().to_string(), Some(alias.trim().to_string())),
        None => (item.trim().to_string(), None),
    }
}

fn split_import_names(names_part: &str) -> Vec<String> {
    names_part
        .replace(['(', ')'], " ")
        .split(',')
        .map(|n| split_alias(n).0)
        .filter(|n| !n.is_empty())
        .collect()
}

/// Removes comments and string contents from one line, tracking
/// triple-quoted strings across lines via `state`. Single-line string
/// literals are replaced by an empty placeholder so surrounding tokens
/// stay separated.
fn strip_line(line: &str, state: &mut StrState) -> String {
    let mut code = String::new();
    let mut rest = line;

    loop {
        match state {
            StrState::Triple(q) => {
                let delim = if *q == '\'' { "'''" } else { "\"\"\"" };
                match rest.find(delim) {
                    Some(pos) => {
                        rest = &rest[pos + 3..];
                        *state = StrState::Code;
                    }
                    None => return code,
                }
            }
            StrState::Code => {
                let mut next = None;
                for (idx, ch) in rest.char_indices() {
                    match ch {
                        '#' => {
                            code.push_str(&rest[..idx]);
                            return code;
                        }
                        '\'' | '"' => {
                            code.push_str(&rest[..idx]);
                            let tail = &rest[idx..];
                            let delim = if ch == '\'' { "'''" } else { "\"\"\"" };
                            if tail.starts_with(delim) {
                                *state = StrState::Triple(ch);
                                next = Some(&tail[3..]);
                            } else {
                                let inner = &tail[1..];
                                match inner.find(ch) {
                                    Some(close) => {
                                        code.push_str("\"\"");
                                        next = Some(&inner[close + 1..]);
                                    }
                                    None => return code,
                                }
                            }
                            break;
                        }
                        _ => {}
                    }
                }
                match next {
                    Some(r) => rest = r,
                    None => {
                        code.push_str(rest);
                        return code;
                    }
                }
            }
        }
    }
}
