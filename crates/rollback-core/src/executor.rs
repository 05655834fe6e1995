use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::StepConfig;

/// The durable step primitive provided by a workflow host.
///
/// A host runs `action` at most once per workflow instance for a given step
/// `name`, persists its result, and on replay after a suspension returns the
/// persisted result without running `action` again. Retries, timeouts and
/// suspension are entirely the host's business; `config` is passed through
/// exactly as the caller supplied it.
pub trait StepExecutor {
    /// Error raised when a step fails after the host gave up on it, or when
    /// the host suspends the workflow.
    type Error;

    /// Execute (or replay) the step `name`.
    ///
    /// `action` may be invoked more than once if the host retries it.
    ///
    /// # Errors
    ///
    /// Returns the host's error once the action has failed for good, or when
    /// the host decides to suspend the workflow at this step.
    fn execute_step<T, F>(
        &self,
        name: &str,
        config: Option<&StepConfig>,
        action: F,
    ) -> Result<T, Self::Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Result<T, Self::Error>;

    /// Whether `error` is this host suspending the workflow rather than a
    /// step failing.
    ///
    /// The default implementation never reports a suspension, suitable for
    /// hosts that do not suspend workflows.
    fn is_suspension(&self, error: &Self::Error) -> bool {
        let _ = error;
        false
    }
}
