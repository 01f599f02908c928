//! ---
//! pmig_section: "04-configuration-orchestration"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Bounded in-memory journal of migration attempts."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Default number of migration records kept in memory.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Step of the hand-off protocol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MigrationStep {
    Pause,
    Resume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: Uuid,
    pub process_id: String,
    pub source_host: String,
    pub target_host: String,
    pub status: MigrationStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_step: Option<MigrationStep>,
    pub error: Option<String>,
}

/// Ring of the most recent migration attempts, oldest dropped first.
#[derive(Debug)]
pub struct MigrationJournal {
    capacity: usize,
    records: Mutex<VecDeque<MigrationRecord>>,
}

impl Default for MigrationJournal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl MigrationJournal {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Record a new attempt in the `pending` state and return its id.
    pub fn begin(&self, process_id: &str, source_host: &str, target_host: &str) -> Uuid {
        let record = MigrationRecord {
            id: Uuid::new_v4(),
            process_id: process_id.to_owned(),
            source_host: source_host.to_owned(),
            target_host: target_host.to_owned(),
            status: MigrationStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            failed_step: None,
            error: None,
        };
        let id = record.id;
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        id
    }

    pub fn mark_in_progress(&self, id: Uuid) {
        self.modify(id, |record| record.status = MigrationStatus::InProgress);
    }

    pub fn complete(&self, id: Uuid) {
        self.modify(id, |record| {
            record.status = MigrationStatus::Completed;
            record.completed_at = Some(Utc::now());
        });
    }

    pub fn fail(&self, id: Uuid, step: MigrationStep, error: impl Into<String>) {
        let error = error.into();
        self.modify(id, |record| {
            record.status = MigrationStatus::Failed;
            record.completed_at = Some(Utc::now());
            record.failed_step = Some(step);
            record.error = Some(error);
        });
    }

    pub fn get(&self, id: Uuid) -> Option<MigrationRecord> {
        self.records
            .lock()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> Vec<MigrationRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Records already evicted by the ring are silently skipped.
    fn modify(&self, id: Uuid, apply: impl FnOnce(&mut MigrationRecord)) {
        if let Some(record) = self
            .records
            .lock()
            .iter_mut()
            .find(|record| record.id == id)
        {
            apply(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_walk_through_statuses() {
        let journal = MigrationJournal::default();
        let id = journal.begin("task-1", "server-a", "server-b");
        assert_eq!(journal.get(id).unwrap().status, MigrationStatus::Pending);

        journal.mark_in_progress(id);
        assert_eq!(journal.get(id).unwrap().status, MigrationStatus::InProgress);

        journal.fail(id, MigrationStep::Resume, "transport failure: refused");
        let record = journal.get(id).unwrap();
        assert_eq!(record.status, MigrationStatus::Failed);
        assert_eq!(record.failed_step, Some(MigrationStep::Resume));
        assert_eq!(record.error.as_deref(), Some("transport failure: refused"));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn oldest_records_are_dropped_at_capacity() {
        let journal = MigrationJournal::new(2);
        let first = journal.begin("a", "server-a", "server-b");
        let second = journal.begin("b", "server-a", "server-b");
        let third = journal.begin("c", "server-a", "server-b");

        assert_eq!(journal.len(), 2);
        assert!(journal.get(first).is_none());
        let ids: Vec<_> = journal.records().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![second, third]);

        journal.complete(first);
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn zero_capacity_still_keeps_the_latest_attempt() {
        let journal = MigrationJournal::new(0);
        assert_eq!(journal.capacity(), 1);
        let id = journal.begin("a", "server-a", "server-b");
        assert_eq!(journal.records().len(), 1);
        assert_eq!(journal.get(id).unwrap().process_id, "a");
    }
}
