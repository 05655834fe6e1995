use rollback_core::{CompensationFailed, RollbackOptions, StepConfig, StepExecutor, UnwindError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::audit::SagaAuditLog;
use crate::handler::RollbackHandler;
use crate::stack::{CompensationRecord, CompensationStack};

/// Name of the durable step that runs the undo half of `name`.
#[must_use]
pub fn undo_step_name(name: &str) -> String {
    format!("Undo {name}")
}

/// Compensation stack manager for one invocation of a workflow body.
///
/// Construct a fresh `Saga` every time the body runs, including every replay
/// after a suspension. The stack is never persisted; replaying the same
/// sequence of calls rebuilds it.
pub struct Saga<'h, H: StepExecutor> {
    host: &'h H,
    stack: CompensationStack<'h, H::Error>,
    audit: SagaAuditLog,
}

impl<'h, H: StepExecutor> Saga<'h, H> {
    #[must_use]
    pub fn new(host: &'h H) -> Self {
        Self {
            host,
            stack: CompensationStack::new(),
            audit: SagaAuditLog::new(),
        }
    }

    /// Execute a step that has nothing to undo.
    ///
    /// Forwards straight to the host and leaves the compensation stack alone.
    ///
    /// # Errors
    ///
    /// Returns the host's error unchanged.
    pub fn step<T, F>(
        &self,
        name: &str,
        config: Option<&StepConfig>,
        action: F,
    ) -> Result<T, H::Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Result<T, H::Error>,
    {
        self.host.execute_step(name, config, action)
    }

    /// Execute a step and register its undo once it has succeeded.
    ///
    /// The undo is run later by [`Saga::rollback_all`] as the durable step
    /// [`undo_step_name`]`(name)`, with the configuration chosen by
    /// `options.undo`, and receives a copy of the value returned here.
    ///
    /// # Errors
    ///
    /// Returns the host's error if `run` fails; nothing is registered then.
    pub fn step_with_rollback<T, R, U>(
        &mut self,
        name: &str,
        handler: RollbackHandler<R, U>,
        options: RollbackOptions,
    ) -> Result<T, H::Error>
    where
        T: Serialize + DeserializeOwned + Clone + 'h,
        R: FnMut() -> Result<T, H::Error>,
        U: Fn(&H::Error, &T) -> Result<(), H::Error> + 'h,
    {
        let RollbackHandler { run, undo } = handler;
        let value = self.host.execute_step(name, options.config.as_ref(), run)?;

        let undo_config = options.undo_config();
        let undo_name = undo_step_name(name);
        let host = self.host;
        let captured = value.clone();
        self.stack.push(CompensationRecord::new(name, move |error: &H::Error| {
            host.execute_step(&undo_name, undo_config.as_ref(), || undo(error, &captured))
        }));
        self.audit.record_registered(name);

        debug!(step = %name, pending = self.stack.len(), "registered compensation");
        Ok(value)
    }

    /// Unwind every registered compensation, most recent first.
    ///
    /// Each undo receives `error`. Returns immediately when nothing is
    /// registered, so calling this again after a completed unwind does not
    /// compensate anything twice.
    ///
    /// # Errors
    ///
    /// Stops at the first undo that fails and returns
    /// [`UnwindError::Compensation`] with a non-retryable
    /// [`CompensationFailed`] naming that step. Records below it stay
    /// registered and are not compensated.
    ///
    /// If the host suspends the workflow while an undo runs, returns
    /// [`UnwindError::Suspended`] carrying the host's error unchanged. The
    /// record is put back on the stack; the unwind continues when the host
    /// replays the workflow.
    pub fn rollback_all(&mut self, error: &H::Error) -> Result<(), UnwindError<H::Error>>
    where
        H::Error: Clone,
    {
        if !self.stack.is_empty() {
            debug!(pending = self.stack.len(), "rolling back registered steps");
        }

        while let Some(record) = self.stack.pop() {
            let step = record.name().to_string();
            debug!(step = %step, remaining = self.stack.len(), "compensating step");

            match record.compensate(error) {
                Ok(()) => self.audit.record_compensated(&step),
                Err(suspension) if self.host.is_suspension(&suspension) => {
                    debug!(step = %step, "workflow suspended during compensation");
                    self.stack.push(record);
                    return Err(UnwindError::Suspended {
                        step,
                        error: suspension,
                    });
                }
                Err(undo_error) => {
                    warn!(
                        step = %step,
                        remaining = self.stack.len(),
                        "compensation failed, leaving remaining steps uncompensated"
                    );
                    self.audit.record_compensation_failed(&step);
                    return Err(CompensationFailed {
                        step,
                        trigger: error.clone(),
                        undo_error,
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Number of registered, not yet compensated steps.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    /// Names of registered steps, oldest first.
    #[must_use]
    pub fn pending_steps(&self) -> Vec<&str> {
        self.stack.names().collect()
    }

    #[must_use]
    pub fn audit(&self) -> &SagaAuditLog {
        &self.audit
    }
}
