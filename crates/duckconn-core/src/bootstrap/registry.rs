//! Bootstrap state per target key
//!
//! One registry is shared by every build in the process. Each target key
//! owns its own slot lock, so concurrent first connections to the same
//! target serialize while unrelated targets proceed in parallel.

use crate::intent::TargetKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// How a bootstrap request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No source configured, or skip requested
    Skipped,
    /// Source fetched and loaded into the table
    Materialized,
    /// Table found by the existence check; nothing fetched
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapRecord {
    pub target_key: TargetKey,
    pub completed: bool,
    pub table_name: Option<String>,
    pub outcome: BootstrapOutcome,
    /// Bootstrap attempts for this key, including failed ones
    pub attempts: u32,
}

impl BootstrapRecord {
    pub fn skipped(target_key: TargetKey) -> Self {
        Self {
            target_key,
            completed: false,
            table_name: None,
            outcome: BootstrapOutcome::Skipped,
            attempts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BootstrapState {
    #[default]
    NotStarted,
    Skipped,
    Completed(BootstrapRecord),
    Failed {
        attempts: u32,
        last_error: String,
    },
}

impl BootstrapState {
    pub fn is_completed(&self) -> bool {
        matches!(self, BootstrapState::Completed(_))
    }

    /// Attempts made so far in this state
    pub fn attempts(&self) -> u32 {
        match self {
            BootstrapState::Completed(record) => record.attempts,
            BootstrapState::Failed { attempts, .. } => *attempts,
            BootstrapState::NotStarted | BootstrapState::Skipped => 0,
        }
    }
}

pub(crate) type Slot = Arc<Mutex<BootstrapState>>;

#[derive(Debug, Default)]
pub struct BootstrapRegistry {
    slots: Mutex<HashMap<TargetKey, Slot>>,
}

impl BootstrapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `key`, created in `NotStarted` on first use
    pub(crate) fn slot(&self, key: &TargetKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Current state of `key`; blocks while a bootstrap for it is running
    pub fn state(&self, key: &TargetKey) -> BootstrapState {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(key).cloned()
        };
        slot.map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .unwrap_or_default()
    }

    /// Return `key` to `NotStarted` so the next connection bootstraps again.
    pub fn reset(&self, key: &TargetKey) {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(key).cloned()
        };
        if let Some(slot) = slot {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = BootstrapState::NotStarted;
        }
    }

    /// Number of target keys seen
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
