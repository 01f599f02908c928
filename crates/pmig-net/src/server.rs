//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "gRPC server exposing one host's lifecycle manager."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;

use pmig_lifecycle::{
    HealthReport, LifecycleError, LifecycleManager, ProcessAck, Snapshot, StatusReport,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::proto;
use crate::proto::process_manager_server::{ProcessManager, ProcessManagerServer};

/// Configures and spawns the ProcessManager gRPC server for one host.
#[derive(Clone)]
pub struct GrpcServerBuilder {
    listen: SocketAddr,
    manager: Arc<LifecycleManager>,
}

impl GrpcServerBuilder {
    pub fn new(listen: SocketAddr, manager: Arc<LifecycleManager>) -> Self {
        Self { listen, manager }
    }

    /// Bind the listener and serve until the returned handle is shut down.
    pub async fn spawn(self) -> anyhow::Result<GrpcServerHandle> {
        let listener = tokio::net::TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            host = self.manager.host_name(),
            "grpc process manager listening"
        );

        let service = ProcessManagerSvc {
            manager: self.manager,
            port: local_addr.port(),
        };
        let incoming = TcpIncoming::from_listener(listener, true, None)
            .map_err(|err| anyhow::anyhow!("failed to build grpc incoming listener: {err}"))?;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let server = Server::builder()
                .add_service(ProcessManagerServer::new(service))
                .serve_with_incoming_shutdown(incoming, async move {
                    let _ = shutdown_rx.changed().await;
                });
            if let Err(err) = server.await {
                warn!(error = %err, "grpc server exited with error");
            }
        });

        Ok(GrpcServerHandle {
            address: local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle returned when spawning the gRPC server.
pub struct GrpcServerHandle {
    address: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GrpcServerHandle {
    /// Socket address the server bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }
}

struct ProcessManagerSvc {
    manager: Arc<LifecycleManager>,
    port: u16,
}

#[tonic::async_trait]
impl ProcessManager for ProcessManagerSvc {
    async fn start_process(
        &self,
        request: Request<proto::StartRequest>,
    ) -> Result<Response<proto::ProcessResponse>, Status> {
        let request = request.into_inner();
        debug!(process = %request.id, "rpc start_process");
        let ack = self
            .manager
            .start(&request.id, &request.r#type)
            .map_err(status_from_error)?;
        Ok(Response::new(ack.into()))
    }

    async fn pause_process(
        &self,
        request: Request<proto::ProcessId>,
    ) -> Result<Response<proto::ProcessState>, Status> {
        let request = request.into_inner();
        debug!(process = %request.id, "rpc pause_process");
        let snapshot = self
            .manager
            .pause(&request.id)
            .map_err(status_from_error)?;
        Ok(Response::new(snapshot.into()))
    }

    async fn resume_process(
        &self,
        request: Request<proto::ResumeRequest>,
    ) -> Result<Response<proto::ProcessResponse>, Status> {
        let request = request.into_inner();
        debug!(process = %request.id, bytes = request.data.len(), "rpc resume_process");
        let ack = self
            .manager
            .resume(&request.id, &request.data)
            .map_err(status_from_error)?;
        Ok(Response::new(ack.into()))
    }

    async fn get_status(
        &self,
        request: Request<proto::ProcessId>,
    ) -> Result<Response<proto::StatusResponse>, Status> {
        let request = request.into_inner();
        let mut report = self
            .manager
            .status(&request.id)
            .map_err(status_from_error)?;
        report.port = Some(self.port);
        Ok(Response::new(report.into()))
    }

    async fn health_check(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        Ok(Response::new(self.manager.health().into()))
    }
}

/// Map a lifecycle failure onto the gRPC status model.
pub fn status_from_error(err: LifecycleError) -> Status {
    let message = err.to_string();
    match err {
        LifecycleError::AlreadyExists { .. } => Status::already_exists(message),
        LifecycleError::NotFound { .. } => Status::not_found(message),
        LifecycleError::FailedPrecondition { .. } => Status::failed_precondition(message),
        LifecycleError::InvalidArgument { .. } => Status::invalid_argument(message),
        LifecycleError::Internal { .. } => Status::internal(message),
    }
}

impl From<ProcessAck> for proto::ProcessResponse {
    fn from(ack: ProcessAck) -> Self {
        Self {
            id: ack.id,
            status: ack.status.to_string(),
            message: ack.message,
        }
    }
}

impl From<Snapshot> for proto::ProcessState {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            id: snapshot.id,
            data: snapshot.data,
            status: snapshot.state.to_string(),
        }
    }
}

impl From<StatusReport> for proto::StatusResponse {
    fn from(report: StatusReport) -> Self {
        Self {
            id: report.id,
            status: report.state.to_string(),
            host: report.host,
            port: report.port.map(u32::from).unwrap_or_default(),
        }
    }
}

impl From<HealthReport> for proto::HealthResponse {
    fn from(report: HealthReport) -> Self {
        Self {
            status: report.status,
            server_name: report.host_name,
            process_count: report.running_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn lifecycle_errors_map_to_grpc_codes() {
        let cases = [
            (LifecycleError::NotFound { id: "a".into() }, Code::NotFound),
            (
                LifecycleError::AlreadyExists { id: "a".into() },
                Code::AlreadyExists,
            ),
            (
                LifecycleError::FailedPrecondition { id: "a".into() },
                Code::FailedPrecondition,
            ),
            (
                LifecycleError::InvalidArgument {
                    id: "a".into(),
                    reason: "snapshot is empty".into(),
                },
                Code::InvalidArgument,
            ),
        ];
        for (err, code) in cases {
            let message = err.to_string();
            let status = status_from_error(err);
            assert_eq!(status.code(), code);
            assert_eq!(status.message(), message);
        }
    }

    #[tokio::test]
    async fn status_reports_bound_port() {
        let manager = Arc::new(LifecycleManager::new("server-a"));
        manager.start("task-1", "compute").unwrap();
        let svc = ProcessManagerSvc {
            manager,
            port: 50051,
        };
        let response = svc
            .get_status(Request::new(proto::ProcessId {
                id: "task-1".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, "running");
        assert_eq!(response.host, "server-a");
        assert_eq!(response.port, 50051);
    }
}
