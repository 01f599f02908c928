//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "gRPC binding of the lifecycle operations."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! gRPC server and client for the `pmig.ProcessManager` service.

pub mod client;
pub mod server;

#[allow(missing_docs)]
pub mod proto {
    tonic::include_proto!("pmig");
}

pub use client::{rpc_error_from_status, GrpcTransport};
pub use server::{status_from_error, GrpcServerBuilder, GrpcServerHandle};
