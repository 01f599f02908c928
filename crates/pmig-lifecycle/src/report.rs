//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Per-host process lifecycle and snapshot store."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::record::LifecycleState;

/// Status string every host reports from its health check.
pub const HEALTHY: &str = "healthy";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AckStatus {
    Started,
    Resumed,
}

/// Acknowledgement returned by Start and Resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessAck {
    pub id: String,
    pub status: AckStatus,
    pub message: String,
}

impl ProcessAck {
    pub(crate) fn started(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            status: AckStatus::Started,
            message: format!("Process {id} started successfully"),
        }
    }

    pub(crate) fn resumed(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            status: AckStatus::Resumed,
            message: format!("Process {id} resumed successfully"),
        }
    }
}

/// Transferable state produced by Pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    /// Encoded snapshot envelope, opaque to everything but Resume.
    pub data: Vec<u8>,
    pub state: LifecycleState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: String,
    pub state: LifecycleState,
    pub host: String,
    /// Filled in by the RPC layer that knows the bound port.
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub host_name: String,
    /// Records currently in the Running state.
    pub running_count: u64,
}
