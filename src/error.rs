//! Plan compilation errors
//!
//! Every failure of the compiler core maps to one variant. All of them are
//! fatal for the current invocation; a rule-table miss is not an error and
//! never shows up here.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Schema document missing, unreadable or not a valid schema
    #[error("error loading schema from {path}: {reason}")]
    SchemaLoad { path: PathBuf, reason: String },

    /// Rule document missing or malformed
    #[error("error loading generator config from {path}: {reason}")]
    RuleLoad { path: PathBuf, reason: String },

    /// Deployment config could not be read
    #[error("error loading configuration from {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural or provider-specific violations, joined with "; "
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("error parsing configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("validation error: '{0}' is required in configuration")]
    MissingField(&'static str),

    /// A resource ID that cannot be used as a single directory name
    #[error("invalid resource id '{id}' (service #{position}): ids must not contain path separators or be '.' or '..'")]
    InvalidResourceId { id: String, position: usize },

    /// Two services resolved to the same resource ID
    #[error("duplicate resource id '{id}' (services #{first} and #{second})")]
    DuplicateResourceId {
        id: String,
        first: usize,
        second: usize,
    },
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;
