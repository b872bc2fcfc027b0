//! Error types for the exercise engine.
//!
//! `ServiceError` lives here rather than in `memtrain-client` so the session
//! controller can downcast failures coming out of any `ExerciseApi` and decide
//! whether they are worth retrying without string matching.

use thiserror::Error;

use crate::model::{ExerciseKind, SessionPhase};

/// Errors raised by an Exercise Session Service implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The bearer token was missing or rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The session (or endpoint) does not exist on the service.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Returns `true` if retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ServiceError::AuthenticationFailed(_) | ServiceError::NotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ServiceError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Pacing was requested for an empty item list.
///
/// This is a precondition violation: the engine never starts a session
/// without items, so hitting it means a caller skipped validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacingError {
    #[error("cannot compute pacing for zero items")]
    NoItems,
}

/// Starting a session failed. The controller stays in `Idle`.
#[derive(Debug, Error)]
pub enum SessionStartError {
    /// The start request to the exercise service failed.
    #[error("failed to start session: {0:#}")]
    Request(anyhow::Error),

    /// The service answered but issued no items.
    #[error("exercise service returned no items")]
    NoItems,

    /// The service issued items of a different exercise kind.
    #[error("exercise service returned items that do not belong to a {0} exercise")]
    MismatchedItems(ExerciseKind),

    #[error(transparent)]
    Pacing(#[from] PacingError),

    /// `start_session` was called outside the `Idle` phase.
    #[error("cannot start a session while in {0} phase")]
    InvalidPhase(SessionPhase),
}

impl SessionStartError {
    /// Whether the user should be offered a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionStartError::Request(e) => !is_permanent(e),
            SessionStartError::NoItems => true,
            SessionStartError::MismatchedItems(_)
            | SessionStartError::Pacing(_)
            | SessionStartError::InvalidPhase(_) => false,
        }
    }
}

/// Submitting recall answers failed. The controller stays in `Recall`
/// with every entered answer intact.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("failed to submit answers: {0:#}")]
    Request(anyhow::Error),

    #[error("cannot submit while in {0} phase")]
    InvalidPhase(SessionPhase),
}

impl SubmissionError {
    /// Whether the user should be offered a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Request(e) => !is_permanent(e),
            SubmissionError::InvalidPhase(_) => false,
        }
    }
}

fn is_permanent(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ServiceError>()
        .is_some_and(ServiceError::is_permanent)
}
