mod orchestrator;
mod result;

pub use orchestrator::{AuditOptions, Auditor};
pub use result::{passed, AuditResult};
