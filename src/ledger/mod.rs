use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ArchAuditError, Result};
use crate::rules::{Finding, EXPIRED_SUPPRESSION};

/// One time-boxed suppression. Every field is mandatory; an entry that
/// cannot expire is an entry that silently widens tolerance forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub file: PathBuf,
    pub rule: String,
    pub reason: String,
    pub owner: String,
    pub created: NaiveDate,
    pub expires: NaiveDate,
}

impl BaselineEntry {
    pub fn matches(&self, finding: &Finding) -> bool {
        self.file == finding.file && self.rule == finding.rule_id
    }

    pub fn is_expired(&self, audit_date: NaiveDate) -> bool {
        self.expires < audit_date
    }

    pub fn days_until_expiry(&self, audit_date: NaiveDate) -> i64 {
        (self.expires - audit_date).num_days()
    }
}

#[derive(Debug, Deserialize)]
struct RawBaselineDoc {
    #[serde(default)]
    schema_version: Option<u32>,
    #[serde(default)]
    last_updated: Option<NaiveDate>,
    #[serde(default)]
    entries: Vec<RawBaselineEntry>,
}

/// Entries deserialize through Options so the error can name the entry and
/// the field instead of surfacing a bare serde message.
#[derive(Debug, Deserialize)]
struct RawBaselineEntry {
    file: Option<PathBuf>,
    rule: Option<String>,
    reason: Option<String>,
    owner: Option<String>,
    created: Option<String>,
    expires: Option<String>,
}

pub const BASELINE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct BaselineLedger {
    pub schema_version: u32,
    pub last_updated: Option<NaiveDate>,
    pub entries: Vec<BaselineEntry>,
}

/// Findings split against the ledger: `active` gates the run, `suppressed`
/// is reported but inert, `expired` are the synthetic CRITICAL findings
/// for entries past their expiry date.
#[derive(Debug, Default)]
pub struct LedgerVerdict {
    pub active: Vec<Finding>,
    pub suppressed: Vec<Finding>,
    pub expired: Vec<Finding>,
}

impl BaselineLedger {
    /// A missing document is an empty ledger; a present document with any
    /// malformed or incomplete entry is fatal for the whole run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no baseline ledger at {}", path.display());
            return Ok(Self {
                schema_version: BASELINE_SCHEMA_VERSION,
                ..Self::default()
            });
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ArchAuditError::LedgerLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawBaselineDoc = serde_yaml::from_str(content)
            .map_err(|e| ArchAuditError::LedgerLoad(format!("malformed document: {}", e)))?;

        let mut entries = Vec::with_capacity(raw.entries.len());
        for (idx, entry) in raw.entries.into_iter().enumerate() {
            entries.push(validate_entry(idx, entry)?);
        }

        Ok(Self {
            schema_version: raw.schema_version.unwrap_or(BASELINE_SCHEMA_VERSION),
            last_updated: raw.last_updated,
            entries,
        })
    }

    pub fn is_suppressed(&self, finding: &Finding, audit_date: NaiveDate) -> bool {
        self.entries
            .iter()
            .any(|e| e.matches(finding) && !e.is_expired(audit_date))
    }

    /// Splits findings into active/suppressed and surfaces every expired
    /// entry as a synthetic finding, so suppressed debt cannot age out
    /// unnoticed.
    pub fn partition(&self, findings: Vec<Finding>, audit_date: NaiveDate) -> LedgerVerdict {
        let mut verdict = LedgerVerdict::default();

        for finding in findings {
            if self.is_suppressed(&finding, audit_date) {
                verdict.suppressed.push(finding);
            } else {
                verdict.active.push(finding);
            }
        }

        for entry in self.entries.iter().filter(|e| e.is_expired(audit_date)) {
            verdict.expired.push(
                Finding::new(
                    entry.file.clone(),
                    &EXPIRED_SUPPRESSION,
                    format!(
                        "suppression of `{}` (owner {}) expired on {}; fix the violation or renew the entry",
                        entry.rule, entry.owner, entry.expires
                    ),
                )
                .with_context(entry.reason.clone()),
            );
        }

        verdict
    }

    pub fn expiring_within(&self, audit_date: NaiveDate, days: i64) -> Vec<&BaselineEntry> {
        self.entries
            .iter()
            .filter(|e| {
                let remaining = e.days_until_expiry(audit_date);
                (0..=days).contains(&remaining)
            })
            .collect()
    }
}

fn validate_entry(idx: usize, raw: RawBaselineEntry) -> Result<BaselineEntry> {
    let missing = |field: &str| {
        ArchAuditError::LedgerLoad(format!("entry {}: missing mandatory field `{}`", idx, field))
    };

    let created = raw.created.ok_or_else(|| missing("created"))?;
    let expires = raw.expires.ok_or_else(|| missing("expires"))?;

    let parse_date = |field: &str, value: &str| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            ArchAuditError::LedgerLoad(format!(
                "entry {}: `{}` is not an ISO date: {}",
                idx, field, value
            ))
        })
    };

    Ok(BaselineEntry {
        file: raw.file.ok_or_else(|| missing("file"))?,
        rule: raw.rule.ok_or_else(|| missing("rule"))?,
        reason: raw.reason.ok_or_else(|| missing("reason"))?,
        owner: raw.owner.ok_or_else(|| missing("owner"))?,
        created: parse_date("created", &created)?,
        expires: parse_date("expires", &expires)?,
    })
}
