//! ---
//! pmig_section: "04-configuration-orchestration"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "In-process hosts for orchestrator unit tests."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! In-process hosts used by the unit tests of this crate.
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use pmig_common::{HostEndpoint, HostRegistry};
use pmig_lifecycle::{HealthReport, LifecycleManager, ProcessAck, Snapshot, StatusReport};

use crate::transport::{HostTransport, RpcError};

pub(crate) struct StubFleet {
    hosts: IndexMap<String, LifecycleManager>,
    offline: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl StubFleet {
    pub(crate) fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            hosts: names
                .iter()
                .map(|name| (name.to_string(), LifecycleManager::new(*name)))
                .collect(),
            offline: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn registry(&self) -> Arc<HostRegistry> {
        Arc::new(HostRegistry::new(self.hosts.keys().enumerate().map(
            |(index, name)| (name.clone(), format!("http://127.0.0.1:{}", 50051 + index)),
        )))
    }

    pub(crate) fn manager(&self, name: &str) -> &LifecycleManager {
        &self.hosts[name]
    }

    pub(crate) fn set_offline(&self, name: &str) {
        self.offline.lock().insert(name.to_owned());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reach(&self, host: &HostEndpoint) -> Result<&LifecycleManager, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.lock().contains(&host.name) {
            return Err(RpcError::transport(format!("{} unreachable", host.address)));
        }
        self.hosts
            .get(&host.name)
            .ok_or_else(|| RpcError::transport(format!("no host at {}", host.address)))
    }
}

#[async_trait]
impl HostTransport for StubFleet {
    async fn start_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        process_type: &str,
    ) -> Result<ProcessAck, RpcError> {
        Ok(self.reach(host)?.start(id, process_type)?)
    }

    async fn pause_process(&self, host: &HostEndpoint, id: &str) -> Result<Snapshot, RpcError> {
        Ok(self.reach(host)?.pause(id)?)
    }

    async fn resume_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        data: Vec<u8>,
    ) -> Result<ProcessAck, RpcError> {
        Ok(self.reach(host)?.resume(id, &data)?)
    }

    async fn get_status(&self, host: &HostEndpoint, id: &str) -> Result<StatusReport, RpcError> {
        Ok(self.reach(host)?.status(id)?)
    }

    async fn health_check(&self, host: &HostEndpoint) -> Result<HealthReport, RpcError> {
        Ok(self.reach(host)?.health())
    }
}
