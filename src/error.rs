use std::time::Duration;
use thiserror::Error;

/// Errors produced by chains and their collaborators.
#[derive(Error, Debug)]
pub enum ChainError {
    /// A provider call failed.
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// JSON serialization or parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A conditional chain found no matching branch and has no default.
    #[error("No matching condition and no default branch set")]
    NoMatchingBranch,

    /// A configuration or contract violation (e.g. misaligned evaluator scores).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An evaluator could not produce a judgement.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// The run was cancelled via the context's cancellation flag.
    #[error("Chain was cancelled")]
    Cancelled,

    /// A single dispatch exceeded the context's dispatch timeout.
    #[error("Dispatch timed out after {0:?}")]
    Timeout(Duration),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ChainError {
    fn from(err: anyhow::Error) -> Self {
        ChainError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
