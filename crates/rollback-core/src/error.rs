use std::path::PathBuf;

use thiserror::Error;

/// Distinguishes failures a host may retry from those it must surface as-is.
pub trait Retryable {
    /// Whether re-running the failed action could succeed.
    fn is_retryable(&self) -> bool;
}

/// A compensation failed while unwinding, leaving the workflow partially
/// rolled back.
///
/// This error is never retryable: unwinding stopped at `step` and the records
/// below it were not compensated.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("compensation failed for step '{step}' (rollback triggered by: {trigger})")]
pub struct CompensationFailed<E> {
    /// Name of the step whose undo failed.
    pub step: String,
    /// The error that started the rollback.
    pub trigger: E,
    /// The error returned by the undo step.
    #[source]
    pub undo_error: E,
}

impl<E> Retryable for CompensationFailed<E> {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Why an unwind stopped before the compensation stack was empty.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnwindError<E> {
    /// The host suspended the workflow while running the undo of `step`.
    ///
    /// Nothing failed: the record for `step` is still registered, and the
    /// host replays the workflow once it resumes.
    #[error("rollback suspended while compensating step '{step}'")]
    Suspended {
        step: String,
        #[source]
        error: E,
    },

    #[error("{0}")]
    Compensation(#[from] CompensationFailed<E>),
}

impl<E> UnwindError<E> {
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }

    #[must_use]
    pub fn compensation(&self) -> Option<&CompensationFailed<E>> {
        match self {
            Self::Compensation(failure) => Some(failure),
            Self::Suspended { .. } => None,
        }
    }

    #[must_use]
    pub fn into_compensation(self) -> Option<CompensationFailed<E>> {
        match self {
            Self::Compensation(failure) => Some(failure),
            Self::Suspended { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read step configuration file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse step configuration")]
    Parse(#[from] toml::de::Error),

    #[error("retry limit {limit} for '{scope}' exceeds the maximum of {max}")]
    InvalidRetryLimit { scope: String, limit: u32, max: u32 },
}
