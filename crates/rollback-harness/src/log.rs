use std::sync::{Arc, Mutex};
use std::time::Duration;

use rollback_core::StepConfig;

use crate::error::HostError;

/// Something the host observed while running a workflow.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HostEvent {
    /// The workflow body was (re-)invoked.
    Invocation { number: u32 },
    /// An action was executed.
    Attempt {
        step: String,
        attempt: u32,
        config: Option<StepConfig>,
    },
    Completed { step: String },
    /// A persisted result was returned without running the action.
    Replayed { step: String },
    Retry {
        step: String,
        attempt: u32,
        delay: Duration,
        error: HostError,
    },
    Failed { step: String, error: HostError },
    Suspended { step: String },
    Resumed { step: String },
}

/// Shared, append-only log of host events.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Vec<HostEvent>>>,
}

impl CallLog {
    /// # Panics
    ///
    /// Panics if the log lock is poisoned.
    pub fn record(&self, event: HostEvent) {
        self.events.lock().expect("lock poisoned").push(event);
    }

    /// # Panics
    ///
    /// Panics if the log lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    /// How many times the action of `step` actually ran.
    #[must_use]
    pub fn attempts(&self, step: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, HostEvent::Attempt { step: s, .. } if s == step))
            .count()
    }

    /// Steps whose actions ran, in execution order, without repeats for
    /// retried attempts.
    #[must_use]
    pub fn executed_steps(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Attempt { step, attempt: 1, .. } => Some(step),
                _ => None,
            })
            .collect()
    }

    /// Configuration the first attempt of `step` ran with.
    ///
    /// The outer `Option` is `None` when the step never ran.
    #[must_use]
    pub fn config_of(&self, step: &str) -> Option<Option<StepConfig>> {
        self.events().into_iter().find_map(|e| match e {
            HostEvent::Attempt { step: s, config, .. } if s == step => Some(config),
            _ => None,
        })
    }

    /// Delays the host waited before each retry of `step`.
    #[must_use]
    pub fn retry_delays(&self, step: &str) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Retry { step: s, delay, .. } if s == step => Some(delay),
                _ => None,
            })
            .collect()
    }
}
