use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the challenge pipelines.
///
/// An empty selection is deliberately absent: it yields an empty derived
/// table and a placeholder chart instead of an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source file is missing, unreadable or malformed.
    #[error("failed to load {}: {source:#}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A column the pipeline relies on is absent or holds the wrong type.
    #[error("schema mismatch on column '{column}': {detail}")]
    SchemaMismatch { column: String, detail: String },

    /// A parameter value of the wrong kind or outside its hard bounds.
    #[error("invalid parameter '{name}': {detail}")]
    InvalidParam { name: String, detail: String },

    #[error("unknown challenge '{0}'")]
    UnknownChallenge(String),
}

impl PipelineError {
    pub fn missing_column(column: &str) -> Self {
        PipelineError::SchemaMismatch {
            column: column.to_string(),
            detail: "column not present in table".to_string(),
        }
    }

    pub fn wrong_type(column: &str, expected: &str, found: impl std::fmt::Display) -> Self {
        PipelineError::SchemaMismatch {
            column: column.to_string(),
            detail: format!("expected {expected}, found '{found}'"),
        }
    }

    pub fn invalid_param(name: &str, detail: impl Into<String>) -> Self {
        PipelineError::InvalidParam {
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
