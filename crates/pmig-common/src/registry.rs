//! ---
//! pmig_section: "01-core-functionality"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Shared primitives and utilities for hosts and the coordinator."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::AppConfig;

/// A resolved registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HostEndpoint {
    pub name: String,
    pub address: String,
}

impl HostEndpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Name to address mapping of every host the coordinator may talk to.
///
/// Readers always observe a complete table: [`HostRegistry::replace`] swaps the
/// whole mapping at once and lookups clone the current `Arc` before reading.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: RwLock<Arc<IndexMap<String, String>>>,
}

impl HostRegistry {
    pub fn new<I, N, A>(hosts: I) -> Self
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            hosts: RwLock::new(Arc::new(collect(hosts))),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config
                .hosts
                .iter()
                .map(|(name, host)| (name.clone(), host.endpoint.clone())),
        )
    }

    pub fn resolve(&self, name: &str) -> Option<HostEndpoint> {
        let hosts = self.current();
        hosts
            .get(name)
            .map(|address| HostEndpoint::new(name, address.clone()))
    }

    /// All registered hosts in declaration order.
    pub fn endpoints(&self) -> Vec<HostEndpoint> {
        self.current()
            .iter()
            .map(|(name, address)| HostEndpoint::new(name.clone(), address.clone()))
            .collect()
    }

    /// Atomically replace the whole mapping.
    pub fn replace<I, N, A>(&self, hosts: I)
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        let next = Arc::new(collect(hosts));
        *self.hosts.write() = next;
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    fn current(&self) -> Arc<IndexMap<String, String>> {
        self.hosts.read().clone()
    }
}

fn collect<I, N, A>(hosts: I) -> IndexMap<String, String>
where
    I: IntoIterator<Item = (N, A)>,
    N: Into<String>,
    A: Into<String>,
{
    hosts
        .into_iter()
        .map(|(name, address)| (name.into(), address.into()))
        .collect()
}
