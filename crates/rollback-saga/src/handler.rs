/// The two halves of a compensating step.
///
/// `run` produces the step's value and is executed as a durable step. `undo`
/// receives the error that triggered the rollback together with exactly the
/// value `run` produced, and is executed as a durable step of its own when the
/// saga unwinds.
pub struct RollbackHandler<R, U> {
    pub run: R,
    pub undo: U,
}

impl<R, U> RollbackHandler<R, U> {
    #[must_use]
    pub fn new(run: R, undo: U) -> Self {
        Self { run, undo }
    }
}
