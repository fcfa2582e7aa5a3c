use std::path::PathBuf;

use thiserror::Error;

/// Failures that callers are expected to branch on.
///
/// Everything else travels as `anyhow::Error` with context attached.
#[derive(Debug, Error)]
pub enum ReconError {
    /// A collaborator the tool cannot work without is not on `PATH`.
    #[error("required tool '{0}' was not found in PATH")]
    MissingTool(String),
    #[error("no host at position {0} in the registry")]
    UnknownOrdinal(usize),
    #[error("'{0}' is not a valid target")]
    InvalidTarget(String),
    #[error("invalid phase selection '{0}'")]
    InvalidSelection(String),
    #[error("report '{0}' does not exist")]
    UnknownReport(String),
    #[error("working directory {path} is not usable: {reason}")]
    WorkDir { path: PathBuf, reason: String },
}
