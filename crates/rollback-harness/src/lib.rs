//! In-memory durable step host for exercising rollback workflows in tests.
//!
//! [`MemoryHost`] memoizes step results in a ledger keyed by step name,
//! retries failed actions according to their [`StepConfig`](rollback_core::StepConfig),
//! suspends the workflow at timers, and records every interaction in a
//! [`CallLog`]. [`WorkflowRunner`] re-invokes a workflow body after each
//! suspension until it finishes, the way a real host replays a workflow.

mod error;
mod host;
mod ledger;
mod log;
mod runner;

pub use error::HostError;
pub use host::MemoryHost;
pub use ledger::{Ledger, LedgerEntry};
pub use log::{CallLog, HostEvent};
pub use runner::{DEFAULT_MAX_INVOCATIONS, RunOutcome, WorkflowRunner};
