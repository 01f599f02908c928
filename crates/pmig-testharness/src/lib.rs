//! ---
//! pmig_section: "11-simulation"
//! pmig_subsection: "01-bootstrap"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "In-process fleet implementing the coordinator transport."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Deterministic fleets for exercising the coordinator without sockets.
//!
//! A [`LocalFleet`] owns one [`LifecycleManager`] per host name and answers
//! [`HostTransport`] calls by invoking them directly. Hosts can be marked
//! unreachable or slow to reproduce partial outages.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use pmig_common::{HostEndpoint, HostRegistry};
use pmig_lifecycle::{HealthReport, LifecycleManager, ProcessAck, Snapshot, StatusReport};
use pmig_orchestrator::{
    FleetHealthAggregator, HostTransport, MigrationOrchestrator, RpcError,
};
use tracing::debug;

/// Base port of the addresses advertised in [`LocalFleet::registry`].
pub const BASE_PORT: u16 = 50051;

/// Names of the five-host fleet used across the test suites.
pub const DEFAULT_HOSTS: [&str; 5] = ["server-a", "server-b", "server-c", "server-d", "server-e"];

#[derive(Debug)]
struct LocalHost {
    manager: Arc<LifecycleManager>,
    address: String,
    reachable: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicUsize,
}

#[derive(Debug)]
pub struct LocalFleet {
    hosts: IndexMap<String, LocalHost>,
}

impl LocalFleet {
    pub fn new<I, N>(names: I) -> Arc<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let hosts = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let name: String = name.into();
                let host = LocalHost {
                    manager: Arc::new(LifecycleManager::new(name.clone())),
                    address: format!("http://127.0.0.1:{}", usize::from(BASE_PORT) + index),
                    reachable: AtomicBool::new(true),
                    latency_ms: AtomicU64::new(0),
                    calls: AtomicUsize::new(0),
                };
                (name, host)
            })
            .collect();
        Arc::new(Self { hosts })
    }

    /// The `server-a`..`server-e` fleet.
    pub fn standard() -> Arc<Self> {
        Self::new(DEFAULT_HOSTS)
    }

    /// Registry listing every host of the fleet in creation order.
    pub fn registry(&self) -> Arc<HostRegistry> {
        Arc::new(HostRegistry::new(
            self.hosts
                .iter()
                .map(|(name, host)| (name.clone(), host.address.clone())),
        ))
    }

    /// Orchestrator wired to this fleet with the given per-call timeout.
    pub fn orchestrator(self: &Arc<Self>, call_timeout: Duration) -> MigrationOrchestrator {
        MigrationOrchestrator::new(self.registry(), self.clone()).with_call_timeout(call_timeout)
    }

    pub fn aggregator(self: &Arc<Self>, call_timeout: Duration) -> FleetHealthAggregator {
        FleetHealthAggregator::new(self.registry(), self.clone()).with_call_timeout(call_timeout)
    }

    /// Direct access to a host's manager, bypassing reachability and latency.
    ///
    /// Panics when the host is not part of the fleet.
    pub fn manager(&self, name: &str) -> Arc<LifecycleManager> {
        self.host(name).manager.clone()
    }

    pub fn set_reachable(&self, name: &str, reachable: bool) {
        self.host(name).reachable.store(reachable, Ordering::SeqCst);
    }

    /// Delay applied before every call to `name` is answered.
    pub fn set_latency(&self, name: &str, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.host(name).latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Calls addressed to `name`, including refused ones.
    pub fn calls(&self, name: &str) -> usize {
        self.host(name).calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.hosts
            .values()
            .map(|host| host.calls.load(Ordering::SeqCst))
            .sum()
    }

    fn host(&self, name: &str) -> &LocalHost {
        match self.hosts.get(name) {
            Some(host) => host,
            None => panic!("host {name} is not part of the local fleet"),
        }
    }

    async fn reach(&self, endpoint: &HostEndpoint) -> Result<Arc<LifecycleManager>, RpcError> {
        let Some(host) = self.hosts.get(&endpoint.name) else {
            return Err(RpcError::transport(format!(
                "no host listening at {}",
                endpoint.address
            )));
        };
        host.calls.fetch_add(1, Ordering::SeqCst);
        let latency = host.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !host.reachable.load(Ordering::SeqCst) {
            debug!(host = %endpoint.name, "refusing call to unreachable host");
            return Err(RpcError::transport(format!(
                "{} unreachable: connection refused",
                endpoint.address
            )));
        }
        Ok(host.manager.clone())
    }
}

#[async_trait]
impl HostTransport for LocalFleet {
    async fn start_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        process_type: &str,
    ) -> Result<ProcessAck, RpcError> {
        Ok(self.reach(host).await?.start(id, process_type)?)
    }

    async fn pause_process(&self, host: &HostEndpoint, id: &str) -> Result<Snapshot, RpcError> {
        Ok(self.reach(host).await?.pause(id)?)
    }

    async fn resume_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        data: Vec<u8>,
    ) -> Result<ProcessAck, RpcError> {
        Ok(self.reach(host).await?.resume(id, &data)?)
    }

    async fn get_status(&self, host: &HostEndpoint, id: &str) -> Result<StatusReport, RpcError> {
        Ok(self.reach(host).await?.status(id)?)
    }

    async fn health_check(&self, host: &HostEndpoint) -> Result<HealthReport, RpcError> {
        Ok(self.reach(host).await?.health())
    }
}
