//! ---
//! pmig_section: "01-core-functionality"
//! pmig_subsection: "binary"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Binary entrypoint for the pmig host daemon."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pmig_common::{init_tracing, AppConfig};
use pmig_lifecycle::LifecycleManager;
use pmig_net::GrpcServerBuilder;
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "pmig host daemon",
    long_about = "Serves the process lifecycle operations of one host over gRPC."
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Host name reported by this daemon")]
    host_name: Option<String>,

    #[arg(
        long,
        value_name = "ADDR",
        help = "Listen address; defaults to the port registered for the host name"
    )]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let candidates = AppConfig::candidates(cli.config.as_deref());
    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;

    if let Some(name) = cli.host_name {
        config.node.name = name;
    }
    let listen = resolve_listen(&config, cli.listen);

    init_tracing("pmigd", &config.logging)?;
    info!(
        config_path = %loaded.source.display(),
        host = %config.node.name,
        hosts = config.hosts.len(),
        "configuration loaded"
    );

    let manager = Arc::new(LifecycleManager::new(config.node.name.clone()));
    let server = GrpcServerBuilder::new(listen, manager)
        .spawn()
        .await
        .with_context(|| format!("failed to start grpc server on {listen}"))?;

    info!(
        host = %config.node.name,
        address = %server.local_addr(),
        "daemon running; waiting for termination signal"
    );
    shutdown_signal().await?;
    info!("shutdown signal received");
    server.shutdown().await?;
    Ok(())
}

/// Explicit flag, else the registered port of this host, else `[node].listen`.
fn resolve_listen(config: &AppConfig, explicit: Option<SocketAddr>) -> SocketAddr {
    if let Some(addr) = explicit {
        return addr;
    }
    match config.host(&config.node.name).and_then(|host| host.port()) {
        Some(port) => SocketAddr::new(config.node.listen.ip(), port),
        None => config.node.listen,
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLEET: &str = r#"
        [node]
        name = "server-a"
        listen = "0.0.0.0:50051"

        [hosts.server-a]
        endpoint = "http://127.0.0.1:50051"

        [hosts.server-c]
        endpoint = "http://127.0.0.1:50053"
    "#;

    #[test]
    fn listen_follows_registered_port() {
        let mut config: AppConfig = FLEET.parse().unwrap();
        config.node.name = "server-c".into();
        assert_eq!(
            resolve_listen(&config, None),
            "0.0.0.0:50053".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn explicit_listen_wins() {
        let config: AppConfig = FLEET.parse().unwrap();
        let explicit: SocketAddr = "127.0.0.1:6000".parse().unwrap();
        assert_eq!(resolve_listen(&config, Some(explicit)), explicit);
    }

    #[test]
    fn unregistered_host_uses_node_listen() {
        let mut config: AppConfig = FLEET.parse().unwrap();
        config.node.name = "server-z".into();
        assert_eq!(resolve_listen(&config, None), config.node.listen);
    }
}
