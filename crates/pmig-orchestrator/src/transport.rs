//! ---
//! pmig_section: "04-configuration-orchestration"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Transport seam between the coordinator and remote hosts."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pmig_common::HostEndpoint;
use pmig_lifecycle::{
    ErrorCode, HealthReport, LifecycleError, ProcessAck, Snapshot, StatusReport,
};
use thiserror::Error;

/// Failure of a single cross-host call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The host answered and refused the operation.
    #[error(transparent)]
    Remote(#[from] LifecycleError),
    /// The host could not be reached or answered with something unexpected.
    #[error("transport failure: {detail}")]
    Transport { detail: String },
    /// The caller-side deadline expired before the host answered.
    #[error("call timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },
}

impl RpcError {
    pub fn transport(detail: impl Into<String>) -> Self {
        RpcError::Transport {
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::Remote(err) => err.code(),
            RpcError::Transport { .. } | RpcError::Timeout { .. } => ErrorCode::TransportFailure,
        }
    }
}

/// Request/response surface every host exposes to the coordinator.
///
/// Implementations must not retry on their own; deadlines are applied by the
/// caller through [`bounded`].
#[async_trait]
pub trait HostTransport: Send + Sync {
    async fn start_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        process_type: &str,
    ) -> Result<ProcessAck, RpcError>;

    async fn pause_process(&self, host: &HostEndpoint, id: &str) -> Result<Snapshot, RpcError>;

    async fn resume_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        data: Vec<u8>,
    ) -> Result<ProcessAck, RpcError>;

    async fn get_status(&self, host: &HostEndpoint, id: &str) -> Result<StatusReport, RpcError>;

    async fn health_check(&self, host: &HostEndpoint) -> Result<HealthReport, RpcError>;
}

/// Run one remote call under a caller-side deadline.
pub async fn bounded<T, F>(after: Duration, call: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(RpcError::Timeout { after }),
    }
}
