//! Shared vocabulary for durable step rollback.
//!
//! This crate defines the narrow interface a durable workflow host has to
//! provide ([`StepExecutor`]), the step configuration that is forwarded to it
//! untouched, and the error raised when a compensation fails.

pub mod config;
pub mod error;
mod executor;

pub use config::{
    Backoff, MAX_RETRY_LIMIT, RetryConfig, RollbackOptions, StepConfig, StepConfigs, UndoConfig,
};
pub use error::{CompensationFailed, ConfigError, Retryable, UnwindError};
pub use executor::StepExecutor;
