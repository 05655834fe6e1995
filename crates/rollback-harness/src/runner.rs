use tracing::debug;

use crate::error::HostError;
use crate::host::MemoryHost;
use crate::log::HostEvent;

pub const DEFAULT_MAX_INVOCATIONS: u32 = 32;

/// Result of driving a workflow to completion.
#[derive(Debug)]
pub struct RunOutcome<O> {
    pub result: Result<O, HostError>,
    /// How many times the body was invoked, counting the first run.
    pub invocations: u32,
}

/// Runs a workflow body against a [`MemoryHost`], replaying it from the top
/// after every suspension.
#[derive(Debug, Clone)]
pub struct WorkflowRunner {
    host: MemoryHost,
    max_invocations: u32,
}

impl Default for WorkflowRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::with_host(MemoryHost::new())
    }

    #[must_use]
    pub fn with_host(host: MemoryHost) -> Self {
        Self {
            host,
            max_invocations: DEFAULT_MAX_INVOCATIONS,
        }
    }

    #[must_use]
    pub fn with_max_invocations(mut self, max_invocations: u32) -> Self {
        self.max_invocations = max_invocations.max(1);
        self
    }

    #[must_use]
    pub fn host(&self) -> &MemoryHost {
        &self.host
    }

    /// Invoke `body` until it returns anything other than a suspension.
    pub fn run<O, F>(&self, mut body: F) -> RunOutcome<O>
    where
        F: FnMut(&MemoryHost) -> Result<O, HostError>,
    {
        let mut invocations = 0;
        loop {
            invocations += 1;
            self.host.log().record(HostEvent::Invocation {
                number: invocations,
            });

            match body(&self.host) {
                Err(HostError::Suspended { step }) if invocations < self.max_invocations => {
                    debug!(step = %step, invocations, "replaying suspended workflow");
                }
                Err(HostError::Suspended { .. }) => {
                    return RunOutcome {
                        result: Err(HostError::InvocationLimit {
                            limit: self.max_invocations,
                        }),
                        invocations,
                    };
                }
                result => return RunOutcome { result, invocations },
            }
        }
    }
}
