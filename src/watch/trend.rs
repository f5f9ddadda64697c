use serde::Serialize;

use super::history::HistoryRecord;

/// Relative change beyond which the trend stops being "stable".
const TREND_THRESHOLD: f64 = 0.10;

pub const DEFAULT_TREND_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Degrading,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Degrading => "degrading",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub recent_mean: f64,
    pub previous_mean: f64,
    /// Records per side of the comparison.
    pub window: usize,
}

/// Moving-average comparison: the mean violation count of the most recent
/// `window` records against the preceding `window`. Needs at least two
/// records; with fewer than `2 * window` the window shrinks to half the
/// available history.
pub fn analyze(records: &[HistoryRecord], window: usize) -> Option<TrendSummary> {
    if records.len() < 2 || window == 0 {
        return None;
    }
    let window = window.min(records.len() / 2);

    let recent = &records[records.len() - window..];
    let previous = &records[records.len() - 2 * window..records.len() - window];

    let mean = |slice: &[HistoryRecord]| {
        slice.iter().map(|r| r.summary.active_findings as f64).sum::<f64>() / slice.len() as f64
    };
    let recent_mean = mean(recent);
    let previous_mean = mean(previous);

    let direction = if previous_mean == 0.0 {
        if recent_mean > 0.0 {
            TrendDirection::Degrading
        } else {
            TrendDirection::Stable
        }
    } else {
        let ratio = recent_mean / previous_mean;
        if ratio < 1.0 - TREND_THRESHOLD {
            TrendDirection::Improving
        } else if ratio > 1.0 + TREND_THRESHOLD {
            TrendDirection::Degrading
        } else {
            TrendDirection::Stable
        }
    };

    Some(TrendSummary {
        direction,
        recent_mean,
        previous_mean,
        window,
    })
}
