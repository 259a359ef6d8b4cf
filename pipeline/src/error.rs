//! Pipeline error types

use shared::ApiFailure;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Terminal failures surfaced to the caller.
///
/// Analysis degradation is never represented here; it is absorbed inside the
/// pipeline. A batch surfaces at most one error: the first terminal failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Raised before any remote call is attempted.
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    /// A remote call failed terminally (or exhausted its retries).
    #[error("provider request failed: {0}")]
    Provider(ApiFailure),
}

impl PipelineError {
    pub fn precondition(message: impl Into<String>) -> Self {
        PipelineError::Precondition {
            message: message.into(),
        }
    }

    /// Distinguishes credential problems so callers can re-prompt for a key
    /// instead of offering a generic retry.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, PipelineError::Provider(ApiFailure::AuthFailed(_)))
    }
}
