mod fixes;

use std::collections::{BTreeMap, BTreeSet};

use colored::Colorize;
use regex::Regex;
use tabled::{settings::Style, Table, Tabled};

use crate::audit::AuditResult;
use crate::error::Result;
use crate::rules::{Finding, Severity};

pub use fixes::{fix_for, FixSuggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Terminal,
    Markdown,
    Json,
}

const SEVERITY_ORDER: &[Severity] = &[
    Severity::Critical,
    Severity::Error,
    Severity::Warning,
    Severity::Info,
];

/// All three forms render from the same grouped view of one AuditResult,
/// so they can never disagree with each other.
pub fn render(result: &AuditResult, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Terminal => Ok(render_terminal(result)),
        ReportFormat::Markdown => Ok(render_markdown(result)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Critical")]
    critical: usize,
    #[tabled(rename = "Error")]
    error: usize,
    #[tabled(rename = "Warning")]
    warning: usize,
    #[tabled(rename = "Info")]
    info: usize,
}

/// category -> severity -> findings, in deterministic render order.
fn grouped(result: &AuditResult) -> BTreeMap<String, BTreeMap<Severity, Vec<&Finding>>> {
    let mut groups: BTreeMap<String, BTreeMap<Severity, Vec<&Finding>>> = BTreeMap::new();
    for finding in &result.active {
        groups
            .entry(finding.category.as_str().to_string())
            .or_default()
            .entry(finding.severity)
            .or_default()
            .push(finding);
    }
    groups
}

fn summary_rows(result: &AuditResult) -> Vec<SummaryRow> {
    grouped(result)
        .into_iter()
        .map(|(category, by_severity)| {
            let count = |s: Severity| by_severity.get(&s).map(|v| v.len()).unwrap_or(0);
            SummaryRow {
                category,
                critical: count(Severity::Critical),
                error: count(Severity::Error),
                warning: count(Severity::Warning),
                info: count(Severity::Info),
            }
        })
        .collect()
}

fn severity_colored(severity: Severity) -> String {
    let label = format!("{} {}", severity.symbol(), severity.as_str());
    match severity {
        Severity::Critical | Severity::Error => label.red().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Info => label.dimmed().to_string(),
    }
}

fn location(finding: &Finding) -> String {
    match finding.line {
        Some(line) => format!("{}:{}", finding.file.display(), line),
        None => finding.file.display().to_string(),
    }
}

fn render_terminal(result: &AuditResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Audited {} file(s) at {}\n",
        result.files_scanned,
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if result.active.is_empty() {
        out.push_str(&format!("{}\n", "✓ no active findings".green()));
    } else {
        let table = Table::new(summary_rows(result))
            .with(Style::sharp())
            .to_string();
        out.push_str(&table);
        out.push('\n');

        for (category, by_severity) in grouped(result) {
            out.push_str(&format!("\n{}\n", category.bold()));
            for severity in SEVERITY_ORDER {
                let Some(findings) = by_severity.get(severity) else {
                    continue;
                };
                for finding in findings {
                    out.push_str(&format!(
                        "  {} {} [{}] {}\n",
                        severity_colored(*severity),
                        location(finding),
                        finding.rule_id,
                        finding.message
                    ));
                    if let Some(context) = &finding.context {
                        out.push_str(&format!("      {}\n", context.as_str().dimmed()));
                    }
                    if let Some(fix) = fix_for(&finding.rule_id) {
                        out.push_str(&format!("      fix: {}\n", fix.advice.dimmed()));
                    }
                }
            }
        }
    }

    if !result.suppressed.is_empty() {
        out.push_str(&format!(
            "\n{} finding(s) suppressed by the baseline ledger\n",
            result.suppressed.len()
        ));
    }

    let status = if result.passed {
        "PASSED".green().bold().to_string()
    } else {
        "FAILED".red().bold().to_string()
    };
    out.push_str(&format!("\n{}\n", status));
    out
}

fn render_markdown(result: &AuditResult) -> String {
    let mut out = String::new();
    out.push_str("# Architecture Audit Report\n\n");
    out.push_str(&format!(
        "**Generated:** {} · **Files scanned:** {} · **Status:** {}\n",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        result.files_scanned,
        if result.passed { "✅ PASSED" } else { "❌ FAILED" }
    ));

    for (category, by_severity) in grouped(result) {
        let total: usize = by_severity.values().map(|v| v.len()).sum();
        out.push_str(&format!("\n## {} ({})\n", category, total));
        for severity in SEVERITY_ORDER {
            let Some(findings) = by_severity.get(severity) else {
                continue;
            };
            out.push_str(&format!("\n### {}\n\n", severity.as_str()));
            for finding in findings {
                out.push_str(&format!(
                    "- `{}` — `{}`: {}\n",
                    location(finding),
                    finding.rule_id,
                    finding.message
                ));
                if let Some(fix) = fix_for(&finding.rule_id) {
                    out.push_str(&format!("  - fix: {}\n", fix.advice));
                    if let (Some(before), Some(after)) = (fix.before, fix.after) {
                        out.push_str(&format!(
                            "\n    ```python\n    # before\n{}\n    # after\n{}\n    ```\n",
                            indent(before, 4),
                            indent(after, 4)
                        ));
                    }
                }
            }
        }
    }

    if !result.suppressed.is_empty() {
        out.push_str(&format!(
            "\n*{} finding(s) suppressed by the baseline ledger.*\n",
            result.suppressed.len()
        ));
    }
    out
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|l| format!("{}{}", pad, l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recovers the per-category counts from a Markdown report. The reverse
/// of `render_markdown`'s `## category (N)` headings.
pub fn parse_markdown_counts(markdown: &str) -> BTreeMap<String, usize> {
    let heading_re = Regex::new(r"^## ([a-z][a-z-]*) \((\d+)\)$").unwrap();
    let mut counts = BTreeMap::new();
    for line in markdown.lines() {
        if let Some(caps) = heading_re.captures(line) {
            if let Ok(count) = caps[2].parse::<usize>() {
                counts.insert(caps[1].to_string(), count);
            }
        }
    }
    counts
}

/// Short summary for posting to an external review system: counts plus
/// the blocking findings with their fixes. Transport is the caller's
/// problem.
pub fn render_comment(result: &AuditResult, blocking: &BTreeSet<Severity>) -> String {
    let blocking_findings: Vec<&Finding> = result.blocking_findings(blocking).collect();
    let mut out = String::new();

    let status = if result.passed {
        "✅ architecture audit passed"
    } else {
        "❌ architecture audit failed"
    };
    out.push_str(&format!(
        "### {}\n\n{} active finding(s) across {} file(s); {} suppressed by baseline.\n",
        status,
        result.active.len(),
        result.files_with_findings().len(),
        result.suppressed.len()
    ));

    if !blocking_findings.is_empty() {
        out.push_str("\n**Blocking:**\n\n");
        for finding in blocking_findings {
            out.push_str(&format!(
                "- `{}` — `{}`: {}\n",
                location(finding),
                finding.rule_id,
                finding.message
            ));
            if let Some(fix) = fix_for(&finding.rule_id) {
                out.push_str(&format!("  - fix: {}\n", fix.advice));
            }
        }
    }
    out
}
