use std::time::Instant;

/// Status of a compensating step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuditStatus {
    /// Run half completed and its undo is outstanding.
    Registered,
    /// Undo executed successfully.
    Compensated,
    /// Undo failed; unwinding stopped here.
    CompensationFailed,
}

/// Record of one compensating step in the saga.
#[derive(Debug)]
pub struct AuditEntry {
    /// Name of the step.
    pub step: String,
    /// Current status.
    pub status: AuditStatus,
    /// When the undo was registered.
    pub registered_at: Instant,
    /// When the undo completed or failed.
    pub resolved_at: Option<Instant>,
}

/// Audit log of compensation activity for one workflow invocation.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    entries: Vec<AuditEntry>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_registered(&mut self, step: &str) {
        self.entries.push(AuditEntry {
            step: step.to_string(),
            status: AuditStatus::Registered,
            registered_at: Instant::now(),
            resolved_at: None,
        });
    }

    pub(crate) fn record_compensated(&mut self, step: &str) {
        self.resolve(step, AuditStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, step: &str) {
        self.resolve(step, AuditStatus::CompensationFailed);
    }

    // Step names may repeat, so resolve the newest still-registered entry,
    // which is the one the stack just popped.
    fn resolve(&mut self, step: &str, status: AuditStatus) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.step == step && e.status == AuditStatus::Registered)
        {
            entry.status = status;
            entry.resolved_at = Some(Instant::now());
        }
    }

    /// Get all entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Get a summary of the compensation activity for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for entry in &self.entries {
            let status = match entry.status {
                AuditStatus::Registered => "+",
                AuditStatus::Compensated => "↩",
                AuditStatus::CompensationFailed => "⚠",
            };
            lines.push(format!("{status} {}", entry.step));
        }
        lines.join("\n")
    }
}
