use std::fmt;

type CompensateFn<'h, E> = Box<dyn Fn(&E) -> Result<(), E> + 'h>;

/// One outstanding undo obligation.
///
/// A record exists only for a step whose run half completed. It leaves the
/// stack when its compensation runs, and is pushed back if the host suspends
/// the workflow before that compensation finishes.
pub struct CompensationRecord<'h, E> {
    name: String,
    compensate: CompensateFn<'h, E>,
}

impl<'h, E> CompensationRecord<'h, E> {
    pub fn new(
        name: impl Into<String>,
        compensate: impl Fn(&E) -> Result<(), E> + 'h,
    ) -> Self {
        Self {
            name: name.into(),
            compensate: Box::new(compensate),
        }
    }

    /// Name of the step this record compensates.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the compensation with the error that triggered the rollback.
    ///
    /// # Errors
    ///
    /// Returns the undo step's error.
    pub fn compensate(&self, error: &E) -> Result<(), E> {
        (self.compensate)(error)
    }
}

impl<E> fmt::Debug for CompensationRecord<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensationRecord")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// LIFO stack of outstanding compensations.
///
/// `push` and `pop` are the only mutators.
pub struct CompensationStack<'h, E> {
    records: Vec<CompensationRecord<'h, E>>,
}

impl<'h, E> CompensationStack<'h, E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: CompensationRecord<'h, E>) {
        self.records.push(record);
    }

    /// Remove the most recently pushed record.
    pub fn pop(&mut self) -> Option<CompensationRecord<'h, E>> {
        self.records.pop()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Step names from the bottom of the stack to the top.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(CompensationRecord::name)
    }
}

impl<E> Default for CompensationStack<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for CompensationStack<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
