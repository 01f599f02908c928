//! ---
//! pmig_section: "01-core-functionality"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Shared primitives and utilities for hosts and the coordinator."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Shared primitives for the pmig workspace.
//! This crate exposes configuration loading, the host registry handed to the
//! coordinator, and the tracing bootstrap used by the daemons.

pub mod config;
pub mod logging;
pub mod registry;

pub use config::{
    AppConfig, HostConfig, JournalConfig, LoadedAppConfig, LoggingConfig, NodeConfig, RpcConfig,
    DEFAULT_CONFIG_CANDIDATES,
};
pub use logging::{init_tracing, LogFormat};
pub use registry::{HostEndpoint, HostRegistry};
