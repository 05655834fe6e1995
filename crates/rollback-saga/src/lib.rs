//! Saga-style compensation for durable workflow steps.
//!
//! [`Saga`] wraps a host's [`StepExecutor`](rollback_core::StepExecutor) and
//! keeps a LIFO stack of undo actions, one per compensating step whose run
//! half has completed. When a later step fails, [`Saga::rollback_all`] unwinds
//! the stack, running each undo as a durable step of its own.
//!
//! A `Saga` lives for one invocation of the workflow body. After the host
//! resumes a suspended workflow, the body runs again from the top: completed
//! steps replay their persisted results, and because registering an undo is
//! plain in-memory bookkeeping, the stack is rebuilt to exactly the state it
//! had before the suspension.

mod audit;
mod handler;
mod saga;
mod stack;

pub use audit::{AuditEntry, AuditStatus, SagaAuditLog};
pub use handler::RollbackHandler;
pub use rollback_core::{CompensationFailed, RollbackOptions, StepConfig, UndoConfig, UnwindError};
pub use saga::{Saga, undo_step_name};
pub use stack::{CompensationRecord, CompensationStack};
