//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Per-host process lifecycle and snapshot store."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Process lifecycle management for a single host.
//!
//! A [`LifecycleManager`] owns every process record on its host and is the only
//! way to start, pause, resume or inspect them.

mod error;
mod manager;
mod record;
mod report;
mod store;

pub use error::{ErrorCode, LifecycleError, Result};
pub use manager::LifecycleManager;
pub use record::{initial_payload, LifecycleState, ProcessRecord, UNKNOWN_PROCESS_TYPE};
pub use report::{AckStatus, HealthReport, ProcessAck, Snapshot, StatusReport, HEALTHY};
