use std::time::Duration;

use rollback_core::{CompensationFailed, Retryable, UnwindError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum HostError {
    /// An action failed; the host may retry it.
    #[error("{0}")]
    Failed(String),

    /// An action failed and must not be retried.
    #[error("{0}")]
    NonRetryable(String),

    #[error("step '{step}' exceeded its timeout of {timeout:?}")]
    Timeout { step: String, timeout: Duration },

    #[error("workflow suspended at '{step}'")]
    Suspended { step: String },

    #[error("{0}")]
    Compensation(Box<CompensationFailed<HostError>>),

    #[error("failed to encode or decode result of step '{step}': {message}")]
    Codec { step: String, message: String },

    #[error("workflow still suspended after {limit} invocations")]
    InvocationLimit { limit: u32 },
}

impl HostError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    #[must_use]
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::NonRetryable(message.into())
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }

    /// The compensation failure carried by this error, if any.
    #[must_use]
    pub fn compensation(&self) -> Option<&CompensationFailed<HostError>> {
        match self {
            Self::Compensation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl Retryable for HostError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Timeout { .. })
    }
}

impl From<CompensationFailed<HostError>> for HostError {
    fn from(failure: CompensationFailed<HostError>) -> Self {
        Self::Compensation(Box::new(failure))
    }
}

/// A suspended unwind hands the suspension back so the workflow is replayed;
/// a failed one becomes a non-retryable [`HostError::Compensation`].
impl From<UnwindError<HostError>> for HostError {
    fn from(error: UnwindError<HostError>) -> Self {
        match error {
            UnwindError::Suspended { error, .. } => error,
            UnwindError::Compensation(failure) => failure.into(),
        }
    }
}
