//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "binary"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Coordinator CLI driving a pmig fleet."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pmig_common::{AppConfig, HostRegistry};
use pmig_logging as logging;
use pmig_net::GrpcTransport;
use pmig_orchestrator::{FleetHealthAggregator, HostTransport, MigrationOrchestrator};

mod fleet;
mod output;
mod process;

use output::Output;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "pmig coordinator: start, inspect and migrate processes across the fleet",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Start a process on a host")]
    Start(process::StartArgs),
    #[command(about = "Show the state of a process on a host")]
    Status(process::StatusArgs),
    #[command(about = "Move a running process from one host to another")]
    Migrate(process::MigrateArgs),
    #[command(about = "Query the health of every registered host")]
    Health,
    #[command(about = "List the host registry")]
    Hosts,
}

/// Coordinator components built from one configuration.
pub(crate) struct Coordinator {
    pub(crate) registry: Arc<HostRegistry>,
    pub(crate) orchestrator: MigrationOrchestrator,
    pub(crate) aggregator: FleetHealthAggregator,
}

impl Coordinator {
    pub(crate) fn new(config: &AppConfig, transport: Arc<dyn HostTransport>) -> Self {
        let registry = Arc::new(HostRegistry::from_config(config));
        let orchestrator = MigrationOrchestrator::new(registry.clone(), transport.clone())
            .with_call_timeout(config.rpc.call_timeout)
            .with_journal_capacity(config.journal.capacity);
        let aggregator = FleetHealthAggregator::new(registry.clone(), transport)
            .with_call_timeout(config.rpc.call_timeout);
        Self {
            registry,
            orchestrator,
            aggregator,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init();
    let cli = Cli::parse();
    let config = AppConfig::load(&AppConfig::candidates(cli.config.as_deref()))?;
    let transport = Arc::new(GrpcTransport::from_config(&config.rpc));
    let coordinator = Coordinator::new(&config, transport);

    let output = run(&coordinator, cli.command).await;
    output.print()?;
    Ok(output.exit_code())
}

async fn run(coordinator: &Coordinator, command: Commands) -> Output {
    match command {
        Commands::Start(args) => process::start(coordinator, args).await,
        Commands::Status(args) => process::status(coordinator, args).await,
        Commands::Migrate(args) => process::migrate(coordinator, args).await,
        Commands::Health => fleet::health(coordinator).await,
        Commands::Hosts => fleet::hosts(coordinator),
    }
}
