use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use glob::glob;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info};

use crate::audit::{AuditOptions, Auditor};
use crate::config::AuditConfig;
use crate::error::Result;
use crate::report::{render, ReportFormat};
use super::debounce::Debouncer;
use super::history::{HistoryLog, HistoryRecord, ResultSummary, Trigger};

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub at: Instant,
}

/// mtime view of the scan roots; two snapshots diff into the set of
/// created, modified, and deleted files.
#[derive(Debug, Default, Clone)]
pub struct FsSnapshot {
    mtimes: HashMap<PathBuf, SystemTime>,
}

impl FsSnapshot {
    pub fn capture(base: &Path, config: &AuditConfig) -> Self {
        let mut mtimes = HashMap::new();
        for root in &config.roots {
            let pattern = base.join(root).join("**/*.py");
            let Ok(matches) = glob(&pattern.to_string_lossy()) else {
                continue;
            };
            for path in matches.filter_map(|r| r.ok()) {
                let rel = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
                if config.is_excluded(&rel) {
                    continue;
                }
                if let Ok(modified) = path.metadata().and_then(|m| m.modified()) {
                    mtimes.insert(rel, modified);
                }
            }
        }
        Self { mtimes }
    }

    /// Paths that differ between `self` (older) and `newer`.
    pub fn diff(&self, newer: &FsSnapshot) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for (path, mtime) in &newer.mtimes {
            match self.mtimes.get(path) {
                Some(old) if old == mtime => {}
                _ => changed.push(path.clone()),
            }
        }
        for path in self.mtimes.keys() {
            if !newer.mtimes.contains_key(path) {
                changed.push(path.clone());
            }
        }
        changed.sort();
        changed
    }
}

/// Polls the roots, funnels change events through a single debounce-owning
/// consumer, re-audits on fire, and appends each outcome to the history
/// log. An audit in flight is never preempted: events arriving mid-audit
/// queue in the channel and coalesce into one follow-up.
pub struct Watcher {
    auditor: Auditor,
    base: PathBuf,
    history: HistoryLog,
}

impl Watcher {
    pub fn new(auditor: Auditor, base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let history = HistoryLog::new(base.join(&auditor.config().history));
        Self {
            auditor,
            base,
            history,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let config = self.auditor.config().clone();
        let window = Duration::from_millis(config.watch.debounce_ms);
        let poll = Duration::from_millis(config.watch.poll_ms);
        let base = self.base.clone();

        let (tx, mut rx) = mpsc::channel::<ChangeEvent>(1024);
        let poller = tokio::spawn(async move {
            let mut previous = FsSnapshot::capture(&base, &config);
            let mut ticker = interval(poll);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let next = FsSnapshot::capture(&base, &config);
                for path in previous.diff(&next) {
                    if tx
                        .send(ChangeEvent {
                            path,
                            at: Instant::now(),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                previous = next;
            }
        });

        info!("watching for changes (debounce {}ms)", window.as_millis());
        let outcome = self.consume(&mut rx, window).await;
        poller.abort();
        outcome
    }

    async fn consume(
        &self,
        rx: &mut mpsc::Receiver<ChangeEvent>,
        window: Duration,
    ) -> Result<()> {
        let mut debouncer = Debouncer::new(window);
        loop {
            let deadline = debouncer.deadline();
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => {
                            debug!("change event: {}", event.path.display());
                            debouncer.observe(event.path, event.at);
                        }
                        None => return Ok(()),
                    }
                }
                _ = sleep_until_opt(deadline) => {
                    if let Some(changed) = debouncer.fire_due(Instant::now()) {
                        self.audit_changed(changed).await?;
                    }
                }
            }
        }
    }

    async fn audit_changed(&self, changed: Vec<PathBuf>) -> Result<()> {
        info!("re-auditing {} changed file(s)", changed.len());
        let existing: Vec<PathBuf> = changed
            .iter()
            .filter(|p| self.base.join(p).exists())
            .cloned()
            .collect();
        // A burst of pure deletions still changes the tree; fall back to a
        // full pass.
        let options = AuditOptions {
            paths: (!existing.is_empty()).then_some(existing),
            ..Default::default()
        };

        let result = self.auditor.audit(&options).await?;
        println!("{}", render(&result, ReportFormat::Terminal)?);

        self.history.append(HistoryRecord {
            timestamp: Utc::now(),
            trigger: Trigger::Watch,
            changed_files: changed,
            summary: ResultSummary::from(&result),
        })
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Commit- and CI-time runs share the watcher's history file; the append
/// is the single observable side effect beyond the returned result.
pub fn record_run(
    base: &Path,
    config: &AuditConfig,
    trigger: Trigger,
    result: &crate::audit::AuditResult,
) -> Result<()> {
    let history = HistoryLog::new(base.join(&config.history));
    history.append(HistoryRecord {
        timestamp: Utc::now(),
        trigger,
        changed_files: result.files_with_findings().into_iter().collect(),
        summary: ResultSummary::from(result),
    })
}
