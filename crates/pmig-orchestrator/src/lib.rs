//! ---
//! pmig_section: "04-configuration-orchestration"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Migration coordinator and fleet health aggregator."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Coordinator-side operations over a registry of hosts.
//!
//! Every remote call goes through [`HostTransport`] and is bounded by a
//! caller-side timeout. Host names are resolved from an injected
//! [`pmig_common::HostRegistry`].

mod health;
mod journal;
mod migration;
mod transport;

#[cfg(test)]
mod test_support;

pub use health::{FleetHealth, FleetHealthAggregator, HostHealth, HostStatus};
pub use journal::{
    MigrationJournal, MigrationRecord, MigrationStatus, MigrationStep, DEFAULT_JOURNAL_CAPACITY,
};
pub use migration::{
    DispatchError, MigrationError, MigrationOrchestrator, MigrationReport, DEFAULT_CALL_TIMEOUT,
};
pub use transport::{bounded, HostTransport, RpcError};
