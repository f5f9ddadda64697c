use std::collections::BTreeMap;

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;
use crate::report::ReportFormat;
use super::history::HistoryRecord;
use super::trend::{analyze, TrendSummary, DEFAULT_TREND_WINDOW};

const MOST_VIOLATED_LIMIT: usize = 10;

/// Pure read-and-render transform over the history log.
#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub total_runs: usize,
    pub passed_runs: usize,
    /// passed runs / total runs, in [0, 1].
    pub compliance_score: f64,
    pub category_distribution: BTreeMap<String, usize>,
    /// (file, total findings), most-violated first.
    pub most_violated: Vec<(String, usize)>,
    pub trend: Option<TrendSummary>,
}

pub fn build(records: &[HistoryRecord]) -> DashboardReport {
    let total_runs = records.len();
    let passed_runs = records.iter().filter(|r| r.summary.passed).count();
    let compliance_score = if total_runs == 0 {
        1.0
    } else {
        passed_runs as f64 / total_runs as f64
    };

    let mut category_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut file_totals: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        for (category, count) in &record.summary.category_counts {
            *category_distribution.entry(category.clone()).or_default() += count;
        }
        for (file, count) in &record.summary.file_counts {
            *file_totals.entry(file.clone()).or_default() += count;
        }
    }

    let mut most_violated: Vec<(String, usize)> = file_totals.into_iter().collect();
    most_violated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_violated.truncate(MOST_VIOLATED_LIMIT);

    DashboardReport {
        total_runs,
        passed_runs,
        compliance_score,
        category_distribution,
        most_violated,
        trend: analyze(records, DEFAULT_TREND_WINDOW),
    }
}

#[derive(Tabled)]
struct ViolatedRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Findings")]
    findings: usize,
}

pub fn render(report: &DashboardReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Terminal => Ok(render_terminal(report)),
    }
}

fn render_terminal(report: &DashboardReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Compliance: {:.1}% ({}/{} runs passed)\n",
        report.compliance_score * 100.0,
        report.passed_runs,
        report.total_runs
    ));
    if let Some(trend) = &report.trend {
        out.push_str(&format!(
            "Trend: {} (recent mean {:.1}, previous {:.1})\n",
            trend.direction, trend.recent_mean, trend.previous_mean
        ));
    }

    if !report.category_distribution.is_empty() {
        out.push_str("\nFindings by category:\n");
        for (category, count) in &report.category_distribution {
            out.push_str(&format!("  {:<20} {}\n", category, count));
        }
    }

    if !report.most_violated.is_empty() {
        let rows: Vec<ViolatedRow> = report
            .most_violated
            .iter()
            .map(|(file, findings)| ViolatedRow {
                file: file.clone(),
                findings: *findings,
            })
            .collect();
        out.push('\n');
        out.push_str(&Table::new(rows).with(Style::sharp()).to_string());
        out.push('\n');
    }
    out
}

fn render_markdown(report: &DashboardReport) -> String {
    let mut out = String::new();
    out.push_str("# Compliance Dashboard\n\n");
    out.push_str(&format!(
        "**Compliance score:** {:.1}% ({} of {} runs passed)\n",
        report.compliance_score * 100.0,
        report.passed_runs,
        report.total_runs
    ));
    if let Some(trend) = &report.trend {
        out.push_str(&format!("**Trend:** {}\n", trend.direction));
    }

    if !report.category_distribution.is_empty() {
        out.push_str("\n## Findings by category\n\n");
        for (category, count) in &report.category_distribution {
            out.push_str(&format!("- {}: {}\n", category, count));
        }
    }

    if !report.most_violated.is_empty() {
        out.push_str("\n## Most violated files\n\n| File | Findings |\n|---|---|\n");
        for (file, findings) in &report.most_violated {
            out.push_str(&format!("| `{}` | {} |\n", file, findings));
        }
    }
    out
}
