//! Error taxonomy for the orchestration core.
//!
//! Content and spelling errors are data ([`crate::domain::BuildError`],
//! [`crate::domain::SpellingError`]); only failures that stop the run are
//! represented here.

/// Errors that abort a docpass run.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("dispatch failed for {package} ({kind}): {detail}")]
    Dispatch {
        package: String,
        kind: String,
        detail: String,
    },

    #[error("worker pool failure: {0}")]
    Pool(String),

    #[error("invalid run request: {0}")]
    InvalidRequest(String),
}

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
