pub mod audit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod report;
pub mod rules;
pub mod source;
pub mod watch;

pub use audit::{passed, AuditOptions, AuditResult, Auditor};
pub use config::{AuditConfig, EngineSpec, EnginesConfig, WatchConfig};
pub use error::{ArchAuditError, Result};
pub use ledger::{BaselineEntry, BaselineLedger, LedgerVerdict};
pub use report::{fix_for, parse_markdown_counts, render, render_comment, FixSuggestion, ReportFormat};
pub use rules::{
    default_detectors, rule_spec, Category, Detector, Engine, Finding, RuleSpec, Severity, RULES,
};
pub use source::{CallSite, Callable, CallableKind, Decorator, Import, SourceParser, SourceUnit};
pub use watch::{
    analyze_trend, build_dashboard, record_run, render_dashboard, DashboardReport, Debouncer,
    FsSnapshot, HistoryLog, HistoryRecord, ResultSummary, TrendDirection, TrendSummary, Trigger,
    Watcher, DEFAULT_TREND_WINDOW,
};
