use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use archaudit::{
    analyze_trend, build_dashboard, AuditConfig, Debouncer, FsSnapshot, HistoryLog,
    HistoryRecord, ResultSummary, TrendDirection, Trigger,
};
use chrono::Utc;
use tempfile::TempDir;

fn summary(active: usize, by_file: &[(&str, usize)]) -> ResultSummary {
    ResultSummary {
        passed: active == 0,
        files_scanned: 20,
        active_findings: active,
        category_counts: BTreeMap::new(),
        file_counts: by_file.iter().map(|(f, c)| (f.to_string(), *c)).collect(),
    }
}

fn record(trigger: Trigger, active: usize) -> HistoryRecord {
    HistoryRecord {
        timestamp: Utc::now(),
        trigger,
        changed_files: vec![],
        summary: summary(active, &[]),
    }
}

#[test]
fn debounce_window_coalesces_burst_into_single_audit() {
    let base = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_secs(2));

    // Events at t=0, t=0.5, t=0.9 with a 2s window.
    debouncer.observe(PathBuf::from("tests/test_a.py"), base);
    debouncer.observe(
        PathBuf::from("tests/test_b.py"),
        base + Duration::from_millis(500),
    );
    debouncer.observe(
        PathBuf::from("tests/test_c.py"),
        base + Duration::from_millis(900),
    );

    let mut fires = 0;
    let mut fired_paths = Vec::new();
    // Sample the timeline every 100ms through t=5s.
    for ms in (0..=5000).step_by(100) {
        if let Some(paths) = debouncer.fire_due(base + Duration::from_millis(ms)) {
            fires += 1;
            fired_paths = paths;
            assert!(ms >= 2900, "fired too early at t={}ms", ms);
        }
    }

    assert_eq!(fires, 1);
    assert_eq!(fired_paths.len(), 3);
}

#[test]
fn history_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let log = HistoryLog::new(dir.path().join(".archaudit/history.json"));

    log.append(record(Trigger::Commit, 3)).unwrap();
    log.append(record(Trigger::Ci, 0)).unwrap();

    let records = log.load().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].trigger, Trigger::Commit);
    assert!(!records[0].summary.passed);
    assert!(records[1].summary.passed);
}

#[test]
fn trend_improves_as_violations_fall() {
    let falling: Vec<HistoryRecord> = [20, 18, 19, 20, 19, 18, 5, 4, 3, 4, 3, 2]
        .iter()
        .map(|&n| record(Trigger::Watch, n))
        .collect();
    let summary = analyze_trend(&falling, 6).unwrap();
    assert_eq!(summary.direction, TrendDirection::Improving);

    let rising: Vec<HistoryRecord> = [2, 3, 2, 12, 14, 13]
        .iter()
        .map(|&n| record(Trigger::Watch, n))
        .collect();
    assert_eq!(
        analyze_trend(&rising, 3).unwrap().direction,
        TrendDirection::Degrading
    );
}

#[test]
fn dashboard_aggregates_history() {
    let records = vec![
        HistoryRecord {
            timestamp: Utc::now(),
            trigger: Trigger::Ci,
            changed_files: vec![],
            summary: summary(3, &[("pages/cart_page.py", 2), ("tests/test_a.py", 1)]),
        },
        HistoryRecord {
            timestamp: Utc::now(),
            trigger: Trigger::Ci,
            changed_files: vec![],
            summary: summary(0, &[]),
        },
        HistoryRecord {
            timestamp: Utc::now(),
            trigger: Trigger::Commit,
            changed_files: vec![],
            summary: summary(1, &[("pages/cart_page.py", 1)]),
        },
    ];

    let report = build_dashboard(&records);
    assert_eq!(report.total_runs, 3);
    assert_eq!(report.passed_runs, 1);
    assert!((report.compliance_score - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        report.most_violated.first(),
        Some(&("pages/cart_page.py".to_string(), 3))
    );
}

#[test]
fn snapshot_diff_feeds_the_watcher() {
    let dir = TempDir::new().unwrap();
    let config = AuditConfig::default();

    let write = |rel: &str, content: &str| {
        let full = dir.path().join(rel);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    };

    write("tests/test_a.py", "import os\n");
    let before = FsSnapshot::capture(dir.path(), &config);

    write("tests/test_b.py", "import sys\n");
    write("pages/login_page.py", "class LoginPage:\n    pass\n");
    let after = FsSnapshot::capture(dir.path(), &config);

    let changed = before.diff(&after);
    assert_eq!(
        changed,
        vec![
            PathBuf::from("pages/login_page.py"),
            PathBuf::from("tests/test_b.py"),
        ]
    );
}
