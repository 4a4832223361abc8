use thiserror::Error;

use crate::common::AuthError;

/// Failures of a moderation request as a whole.
///
/// Expected decision results (already decided, unknown event) are values in
/// [`super::DecideOutcome`], not errors.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A backing store could not be reached or returned an error.
    #[error("Store unavailable: {0:#}")]
    Unavailable(#[from] anyhow::Error),
}

impl ModerationError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        ModerationError::NotFound(what.to_string())
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        ModerationError::PreconditionFailed(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        ModerationError::Conflict(reason.into())
    }
}

pub type ModerationResult<T> = Result<T, ModerationError>;
