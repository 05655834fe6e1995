use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bincode::config;

use rollback_core::{Retryable, StepConfig, StepExecutor};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::HostError;
use crate::ledger::{Ledger, LedgerEntry};
use crate::log::{CallLog, HostEvent};

/// Durable step host backed by an in-memory ledger.
///
/// Clones share the same ledger, clock and call log, so a clone handed to a
/// workflow body observes everything the original has persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    ledger: Arc<Mutex<Ledger>>,
    elapsed: Arc<Mutex<Duration>>,
    log: CallLog,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Snapshot of the persisted ledger.
    ///
    /// # Panics
    ///
    /// Panics if the ledger lock is poisoned.
    #[must_use]
    pub fn ledger(&self) -> Ledger {
        self.ledger.lock().expect("lock poisoned").clone()
    }

    /// Virtual time spent in retry delays and timers.
    ///
    /// # Panics
    ///
    /// Panics if the clock lock is poisoned.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("lock poisoned")
    }

    /// Durable timer.
    ///
    /// The first time a workflow reaches `name` the timer is persisted and the
    /// workflow is suspended; when the body is replayed the timer has fired and
    /// this returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Suspended`] the first time `name` is reached.
    ///
    /// # Panics
    ///
    /// Panics if the ledger lock is poisoned.
    pub fn sleep(&self, name: &str, duration: Duration) -> Result<(), HostError> {
        let fired = matches!(
            self.ledger.lock().expect("lock poisoned").get(name),
            Some(LedgerEntry::Timer(_))
        );
        if fired {
            trace!(step = %name, "timer already fired");
            self.log.record(HostEvent::Resumed {
                step: name.to_string(),
            });
            return Ok(());
        }

        self.ledger
            .lock()
            .expect("lock poisoned")
            .insert(name, LedgerEntry::Timer(duration));
        self.advance(duration);
        debug!(step = %name, ?duration, "suspending workflow");
        self.log.record(HostEvent::Suspended {
            step: name.to_string(),
        });
        Err(HostError::Suspended {
            step: name.to_string(),
        })
    }

    fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().expect("lock poisoned");
        *elapsed = elapsed.saturating_add(by);
    }

    fn persist(&self, name: &str, entry: LedgerEntry) {
        self.ledger
            .lock()
            .expect("lock poisoned")
            .insert(name, entry);
    }

    fn replay<T: DeserializeOwned>(&self, name: &str, entry: LedgerEntry) -> Result<T, HostError> {
        trace!(step = %name, "replaying persisted step result");
        self.log.record(HostEvent::Replayed {
            step: name.to_string(),
        });
        match entry {
            LedgerEntry::Completed { payload, json } => {
                match bincode::serde::decode_from_slice::<T, _>(&payload, config::standard()) {
                    Ok((value, _)) => Ok(value),
                    Err(e) => {
                        trace!(step = %name, error = %e, "decoding persisted result from json");
                        serde_json::from_value(json).map_err(|e| codec_error(name, e))
                    }
                }
            }
            LedgerEntry::Failed(error) => Err(error),
            LedgerEntry::Timer(_) => Err(HostError::Codec {
                step: name.to_string(),
                message: "name already used by a timer".to_string(),
            }),
        }
    }
}

impl StepExecutor for MemoryHost {
    type Error = HostError;

    fn execute_step<T, F>(
        &self,
        name: &str,
        config: Option<&StepConfig>,
        mut action: F,
    ) -> Result<T, HostError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Result<T, HostError>,
    {
        let persisted = self
            .ledger
            .lock()
            .expect("lock poisoned")
            .get(name)
            .cloned();
        if let Some(entry) = persisted {
            return self.replay(name, entry);
        }

        let retries = config.and_then(|c| c.retries.as_ref());
        let limit = config.map_or(0, StepConfig::retry_limit);
        let timeout = config.and_then(StepConfig::timeout);

        let mut attempt = 1;
        loop {
            self.log.record(HostEvent::Attempt {
                step: name.to_string(),
                attempt,
                config: config.cloned(),
            });

            let started = Instant::now();
            let outcome = match (action(), timeout) {
                (Ok(_), Some(timeout)) if started.elapsed() > timeout => Err(HostError::Timeout {
                    step: name.to_string(),
                    timeout,
                }),
                (outcome, _) => outcome,
            };

            match outcome {
                Ok(value) => {
                    let payload = bincode::serde::encode_to_vec(&value, config::standard())
                        .map_err(|e| codec_error(name, e))?;
                    let json = serde_json::to_value(&value).map_err(|e| codec_error(name, e))?;
                    self.persist(name, LedgerEntry::Completed { payload, json });
                    self.log.record(HostEvent::Completed {
                        step: name.to_string(),
                    });
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && attempt <= limit => {
                    let delay = retries.map_or(Duration::ZERO, |r| r.delay_for_attempt(attempt));
                    debug!(step = %name, attempt, ?delay, %error, "retrying step");
                    self.advance(delay);
                    self.log.record(HostEvent::Retry {
                        step: name.to_string(),
                        attempt,
                        delay,
                        error,
                    });
                    attempt += 1;
                }
                Err(error) => {
                    if !error.is_suspended() {
                        debug!(step = %name, attempt, %error, "step failed");
                        self.persist(name, LedgerEntry::Failed(error.clone()));
                        self.log.record(HostEvent::Failed {
                            step: name.to_string(),
                            error: error.clone(),
                        });
                    }
                    return Err(error);
                }
            }
        }
    }

    fn is_suspension(&self, error: &HostError) -> bool {
        error.is_suspended()
    }
}

fn codec_error(step: &str, error: impl Display) -> HostError {
    HostError::Codec {
        step: step.to_string(),
        message: error.to_string(),
    }
}
