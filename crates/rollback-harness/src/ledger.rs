use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::error::HostError;

/// Persisted outcome of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    /// A completed step's result, encoded twice.
    ///
    /// `payload` is the bincode encoding replays decode from; unlike JSON it
    /// keeps nested optionals such as `Some(None)` apart from `None`. `json`
    /// is a readable copy, and the fallback for types that can only be
    /// decoded from a self-describing format.
    Completed { payload: Vec<u8>, json: Value },
    Failed(HostError),
    Timer(Duration),
}

/// Durable record of every step a workflow instance has finished.
///
/// Survives across invocations of the workflow body; this is the only state
/// a replay can rely on.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    #[must_use]
    pub fn get(&self, step: &str) -> Option<&LedgerEntry> {
        self.entries.get(step)
    }

    pub(crate) fn insert(&mut self, step: &str, entry: LedgerEntry) {
        self.entries.insert(step.to_string(), entry);
    }

    #[must_use]
    pub fn contains(&self, step: &str) -> bool {
        self.entries.contains_key(step)
    }

    /// Persisted JSON value of a completed step.
    #[must_use]
    pub fn completed_value(&self, step: &str) -> Option<&Value> {
        match self.entries.get(step) {
            Some(LedgerEntry::Completed { json, .. }) => Some(json),
            _ => None,
        }
    }
}
