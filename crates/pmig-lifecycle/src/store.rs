//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Per-host process lifecycle and snapshot store."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{LifecycleError, Result};
use crate::record::{LifecycleState, ProcessRecord};

/// In-memory table of process records for one host.
///
/// A single mutex serialises every mutation. The running counter is only
/// written while that mutex is held, so it always matches the table, but it
/// can be read without taking the lock.
#[derive(Debug, Default)]
pub(crate) struct SnapshotStore {
    records: Mutex<HashMap<String, ProcessRecord>>,
    running: AtomicUsize,
}

impl SnapshotStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a record for an id that has never been seen on this host.
    pub(crate) fn insert_new(&self, record: ProcessRecord) -> Result<()> {
        let mut records = self.records.lock();
        if records.contains_key(&record.id) {
            return Err(LifecycleError::AlreadyExists { id: record.id });
        }
        self.track(false, record.is_running());
        records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Run `mutate` against an existing record while holding the table lock.
    ///
    /// `mutate` must leave the record untouched when it returns an error.
    pub(crate) fn update<R>(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut ProcessRecord) -> Result<R>,
    ) -> Result<R> {
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(id) else {
            return Err(LifecycleError::NotFound { id: id.to_owned() });
        };
        let was_running = record.is_running();
        let outcome = mutate(&mut *record);
        self.track(was_running, record.is_running());
        outcome
    }

    /// Insert or overwrite a record, returning the state it replaced.
    pub(crate) fn replace(&self, record: ProcessRecord) -> LifecycleState {
        let mut records = self.records.lock();
        let now_running = record.is_running();
        let previous = records.insert(record.id.clone(), record);
        let previous_state = previous
            .as_ref()
            .map(|prev| prev.state)
            .unwrap_or(LifecycleState::Absent);
        self.track(previous_state == LifecycleState::Running, now_running);
        previous_state
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: &str) -> Option<ProcessRecord> {
        self.records.lock().get(id).cloned()
    }

    pub(crate) fn state_of(&self, id: &str) -> LifecycleState {
        self.records
            .lock()
            .get(id)
            .map(|record| record.state)
            .unwrap_or(LifecycleState::Absent)
    }

    pub(crate) fn running_count(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.lock().len()
    }

    fn track(&self, was_running: bool, is_running: bool) {
        match (was_running, is_running) {
            (false, true) => {
                self.running.fetch_add(1, Ordering::AcqRel);
            }
            (true, false) => {
                self.running.fetch_sub(1, Ordering::AcqRel);
            }
            _ => {}
        }
    }
}
