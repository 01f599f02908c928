//! ---
//! pmig_section: "04-configuration-orchestration"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Concurrent health fan-out across the registered fleet."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use pmig_common::{HostEndpoint, HostRegistry};
use pmig_lifecycle::HealthReport;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::migration::DEFAULT_CALL_TIMEOUT;
use crate::transport::{bounded, HostTransport, RpcError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HostStatus {
    Healthy,
    Offline,
}

/// One host's answer, or the reason it did not give one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostHealth {
    pub host: String,
    pub address: String,
    pub status: HostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_count: Option<u64>,
    /// Name the host reported for itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostHealth {
    fn from_outcome(endpoint: HostEndpoint, outcome: Result<HealthReport, RpcError>) -> Self {
        match outcome {
            Ok(report) => Self {
                host: endpoint.name,
                address: endpoint.address,
                status: HostStatus::Healthy,
                running_count: Some(report.running_count),
                reported_name: Some(report.host_name),
                error: None,
            },
            Err(err) => Self {
                host: endpoint.name,
                address: endpoint.address,
                status: HostStatus::Offline,
                running_count: None,
                reported_name: None,
                error: Some(err.to_string()),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HostStatus::Healthy
    }
}

/// Snapshot of the whole fleet, keyed by host name in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetHealth {
    pub hosts: IndexMap<String, HostHealth>,
    pub checked_at: DateTime<Utc>,
}

impl FleetHealth {
    pub fn get(&self, host: &str) -> Option<&HostHealth> {
        self.hosts.get(host)
    }

    pub fn online_count(&self) -> usize {
        self.hosts.values().filter(|host| host.is_healthy()).count()
    }

    pub fn total_running(&self) -> u64 {
        self.hosts
            .values()
            .filter_map(|host| host.running_count)
            .sum()
    }
}

/// Queries every registered host concurrently and never fails as a whole.
pub struct FleetHealthAggregator {
    registry: Arc<HostRegistry>,
    transport: Arc<dyn HostTransport>,
    call_timeout: Duration,
}

impl std::fmt::Debug for FleetHealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetHealthAggregator")
            .field("hosts", &self.registry.len())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl FleetHealthAggregator {
    pub fn new(registry: Arc<HostRegistry>, transport: Arc<dyn HostTransport>) -> Self {
        Self {
            registry,
            transport,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Health of every host registered at the time of the call.
    ///
    /// Each call is bounded by the per-call timeout; an unreachable host is
    /// reported as offline instead of aborting the aggregation.
    pub async fn fleet_health(&self) -> FleetHealth {
        let endpoints = self.registry.endpoints();
        let probes = endpoints.into_iter().map(|endpoint| async move {
            let outcome = bounded(self.call_timeout, self.transport.health_check(&endpoint)).await;
            if let Err(err) = &outcome {
                warn!(host = %endpoint.name, address = %endpoint.address, error = %err, "health check failed");
            }
            HostHealth::from_outcome(endpoint, outcome)
        });
        let hosts: IndexMap<String, HostHealth> = join_all(probes)
            .await
            .into_iter()
            .map(|health| (health.host.clone(), health))
            .collect();

        let health = FleetHealth {
            hosts,
            checked_at: Utc::now(),
        };
        debug!(
            hosts = health.hosts.len(),
            online = health.online_count(),
            running = health.total_running(),
            "fleet health collected"
        );
        health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubFleet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn offline_hosts_are_reported_not_raised() {
        let fleet = StubFleet::new(&["server-a", "server-b", "server-c"]);
        fleet.manager("server-a").start("a-1", "compute").unwrap();
        fleet.manager("server-a").start("a-2", "compute").unwrap();
        fleet.set_offline("server-b");

        let aggregator = FleetHealthAggregator::new(fleet.registry(), fleet.clone())
            .with_call_timeout(Duration::from_millis(200));
        let health = aggregator.fleet_health().await;

        let names: Vec<_> = health.hosts.keys().cloned().collect();
        assert_eq!(names, vec!["server-a", "server-b", "server-c"]);
        assert_eq!(health.online_count(), 2);
        assert_eq!(health.total_running(), 2);

        let offline = health.get("server-b").unwrap();
        assert_eq!(offline.status, HostStatus::Offline);
        assert!(offline.error.as_deref().unwrap().contains("unreachable"));
        assert_eq!(offline.running_count, None);

        let online = health.get("server-a").unwrap();
        assert_eq!(online.reported_name.as_deref(), Some("server-a"));
        assert_eq!(online.running_count, Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_registry_yields_empty_report() {
        let fleet = StubFleet::new(&[]);
        let aggregator = FleetHealthAggregator::new(fleet.registry(), fleet.clone());
        let health = aggregator.fleet_health().await;
        assert!(health.hosts.is_empty());
        assert_eq!(health.total_running(), 0);
    }
}
