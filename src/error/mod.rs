use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchAuditError {
    /// Contained: the orchestrator converts this into a `parse-error` finding.
    #[error("parse error in {} (line {line}): {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Fatal: a mis-loaded suppression would silently over- or under-suppress.
    #[error("baseline ledger error: {0}")]
    LedgerLoad(String),

    #[error("config error: {0}")]
    Config(String),

    /// Fatal after bounded retries: an audit whose outcome cannot be recorded
    /// must not report success.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("audit task error: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchAuditError {
    /// Fatal errors abort the run with no partial result; contained errors
    /// surface as ordinary findings.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ArchAuditError::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, ArchAuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_contained() {
        let err = ArchAuditError::Parse {
            path: PathBuf::from("tests/test_login.py"),
            line: 12,
            message: "unterminated triple-quoted string".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("line 12"));
    }

    #[test]
    fn test_ledger_error_is_fatal() {
        let err = ArchAuditError::LedgerLoad("entry 2: missing field `expires`".to_string());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_persistence_error_is_fatal() {
        let err = ArchAuditError::Persistence("history write failed after 3 attempts".to_string());
        assert!(err.is_fatal());
    }
}
