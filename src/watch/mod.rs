mod dashboard;
mod debounce;
mod history;
mod trend;
mod watcher;

pub use dashboard::{build as build_dashboard, render as render_dashboard, DashboardReport};
pub use debounce::Debouncer;
pub use history::{HistoryLog, HistoryRecord, ResultSummary, Trigger};
pub use trend::{analyze as analyze_trend, TrendDirection, TrendSummary, DEFAULT_TREND_WINDOW};
pub use watcher::{record_run, ChangeEvent, FsSnapshot, Watcher};
