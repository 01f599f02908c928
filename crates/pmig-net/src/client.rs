//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "gRPC client implementing the coordinator transport."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pmig_common::{HostEndpoint, RpcConfig};
use pmig_lifecycle::{
    AckStatus, HealthReport, LifecycleError, LifecycleState, ProcessAck, Snapshot, StatusReport,
};
use pmig_orchestrator::{HostTransport, RpcError};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::debug;

use crate::proto;
use crate::proto::process_manager_client::ProcessManagerClient;

/// [`HostTransport`] over gRPC, one lazily connected channel per address.
#[derive(Debug)]
pub struct GrpcTransport {
    connect_timeout: Duration,
    request_timeout: Duration,
    channels: Mutex<HashMap<String, Channel>>,
}

impl GrpcTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RpcConfig) -> Self {
        Self::new(config.connect_timeout, config.call_timeout)
    }

    fn client(&self, host: &HostEndpoint) -> Result<ProcessManagerClient<Channel>, RpcError> {
        let mut channels = self.channels.lock();
        if let Some(channel) = channels.get(&host.address) {
            return Ok(ProcessManagerClient::new(channel.clone()));
        }
        let endpoint = Endpoint::from_shared(host.address.clone())
            .map_err(|err| {
                RpcError::transport(format!("invalid endpoint '{}': {err}", host.address))
            })?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);
        let channel = endpoint.connect_lazy();
        debug!(host = %host.name, address = %host.address, "opened grpc channel");
        channels.insert(host.address.clone(), channel.clone());
        Ok(ProcessManagerClient::new(channel))
    }
}

#[async_trait]
impl HostTransport for GrpcTransport {
    async fn start_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        process_type: &str,
    ) -> Result<ProcessAck, RpcError> {
        let response = self
            .client(host)?
            .start_process(proto::StartRequest {
                id: id.to_owned(),
                r#type: process_type.to_owned(),
            })
            .await
            .map_err(|status| rpc_error_from_status(id, status))?;
        ack_from_response(response.into_inner())
    }

    async fn pause_process(&self, host: &HostEndpoint, id: &str) -> Result<Snapshot, RpcError> {
        let response = self
            .client(host)?
            .pause_process(proto::ProcessId { id: id.to_owned() })
            .await
            .map_err(|status| rpc_error_from_status(id, status))?
            .into_inner();
        Ok(Snapshot {
            id: response.id,
            data: response.data,
            state: parse_field::<LifecycleState>("status", &response.status)?,
        })
    }

    async fn resume_process(
        &self,
        host: &HostEndpoint,
        id: &str,
        data: Vec<u8>,
    ) -> Result<ProcessAck, RpcError> {
        let response = self
            .client(host)?
            .resume_process(proto::ResumeRequest {
                id: id.to_owned(),
                data,
            })
            .await
            .map_err(|status| rpc_error_from_status(id, status))?;
        ack_from_response(response.into_inner())
    }

    async fn get_status(&self, host: &HostEndpoint, id: &str) -> Result<StatusReport, RpcError> {
        let response = self
            .client(host)?
            .get_status(proto::ProcessId { id: id.to_owned() })
            .await
            .map_err(|status| rpc_error_from_status(id, status))?
            .into_inner();
        Ok(StatusReport {
            id: response.id,
            state: parse_field::<LifecycleState>("status", &response.status)?,
            host: response.host,
            port: u16::try_from(response.port).ok().filter(|port| *port != 0),
        })
    }

    async fn health_check(&self, host: &HostEndpoint) -> Result<HealthReport, RpcError> {
        let response = self
            .client(host)?
            .health_check(proto::Empty {})
            .await
            .map_err(|status| rpc_error_from_status("", status))?
            .into_inner();
        Ok(HealthReport {
            status: response.status,
            host_name: response.server_name,
            running_count: response.process_count,
        })
    }
}

/// Map a gRPC status back onto the lifecycle error taxonomy.
///
/// Codes a host produces for its own refusals become [`RpcError::Remote`];
/// everything else is a transport failure carrying the code and message.
pub fn rpc_error_from_status(id: &str, status: Status) -> RpcError {
    let id = id.to_owned();
    match status.code() {
        Code::NotFound => LifecycleError::NotFound { id }.into(),
        Code::AlreadyExists => LifecycleError::AlreadyExists { id }.into(),
        Code::FailedPrecondition => LifecycleError::FailedPrecondition { id }.into(),
        Code::InvalidArgument => LifecycleError::InvalidArgument {
            id,
            reason: status.message().to_owned(),
        }
        .into(),
        code => RpcError::transport(format!("{code:?}: {}", status.message())),
    }
}

fn ack_from_response(response: proto::ProcessResponse) -> Result<ProcessAck, RpcError> {
    Ok(ProcessAck {
        status: parse_field::<AckStatus>("status", &response.status)?,
        id: response.id,
        message: response.message,
    })
}

fn parse_field<T: FromStr>(field: &str, value: &str) -> Result<T, RpcError> {
    value
        .parse()
        .map_err(|_| RpcError::transport(format!("unexpected {field} '{value}' in response")))
}
