//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "binary"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Coordinator CLI driving a pmig fleet."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Single-process commands: start, status and migrate.
use clap::Args;
use pmig_orchestrator::{DispatchError, MigrationError};
use serde_json::json;

use crate::output::Output;
use crate::Coordinator;

#[derive(Debug, Args)]
pub(crate) struct StartArgs {
    /// Process identifier, unique across the fleet.
    pub(crate) id: String,
    #[arg(long, help = "Host to start the process on")]
    pub(crate) host: String,
    #[arg(long = "type", default_value = "compute", help = "Process type tag")]
    pub(crate) process_type: String,
}

#[derive(Debug, Args)]
pub(crate) struct StatusArgs {
    pub(crate) id: String,
    #[arg(long, help = "Host to query")]
    pub(crate) host: String,
}

#[derive(Debug, Args)]
pub(crate) struct MigrateArgs {
    pub(crate) id: String,
    #[arg(long, help = "Host currently running the process")]
    pub(crate) from: String,
    #[arg(long, help = "Host that should resume the process")]
    pub(crate) to: String,
}

pub(crate) async fn start(coordinator: &Coordinator, args: StartArgs) -> Output {
    match coordinator
        .orchestrator
        .start_process(&args.id, &args.process_type, &args.host)
        .await
    {
        Ok(ack) => Output::success(&ack),
        Err(err) => dispatch_failure(&args.id, err),
    }
}

pub(crate) async fn status(coordinator: &Coordinator, args: StatusArgs) -> Output {
    match coordinator
        .orchestrator
        .process_status(&args.id, &args.host)
        .await
    {
        Ok(report) => Output::success(&report),
        Err(err) => dispatch_failure(&args.id, err),
    }
}

pub(crate) async fn migrate(coordinator: &Coordinator, args: MigrateArgs) -> Output {
    match coordinator
        .orchestrator
        .migrate(&args.id, &args.from, &args.to)
        .await
    {
        Ok(report) => Output::success(&report),
        Err(err) => migration_failure(&args, err),
    }
}

fn dispatch_failure(id: &str, err: DispatchError) -> Output {
    let host = match &err {
        DispatchError::UnknownHost { host } | DispatchError::Rpc { host, .. } => host.clone(),
    };
    Output::failure(err.code(), err.to_string(), json!({"id": id, "host": host}))
}

fn migration_failure(args: &MigrateArgs, err: MigrationError) -> Output {
    Output::failure(
        err.code(),
        err.to_string(),
        json!({
            "id": args.id,
            "source_host": args.from,
            "target_host": args.to,
            "migration_id": err.migration_id(),
            "step": err.step(),
            "orphaned_source": err.leaves_orphan(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pmig_common::AppConfig;
    use pmig_testharness::LocalFleet;

    use super::*;

    fn coordinator(fleet: &std::sync::Arc<LocalFleet>) -> Coordinator {
        let mut config = AppConfig::default();
        for endpoint in fleet.registry().endpoints() {
            config.hosts.insert(
                endpoint.name,
                pmig_common::HostConfig {
                    endpoint: endpoint.address,
                },
            );
        }
        config.rpc.call_timeout = Duration::from_millis(200);
        Coordinator::new(&config, fleet.clone())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_then_migrate_reports_json() {
        let fleet = LocalFleet::standard();
        let coordinator = coordinator(&fleet);

        let started = start(
            &coordinator,
            StartArgs {
                id: "task-1".into(),
                host: "server-a".into(),
                process_type: "compute".into(),
            },
        )
        .await;
        assert!(started.success);
        assert_eq!(started.body["status"], json!("started"));

        let migrated = migrate(
            &coordinator,
            MigrateArgs {
                id: "task-1".into(),
                from: "server-a".into(),
                to: "server-b".into(),
            },
        )
        .await;
        assert!(migrated.success);
        assert_eq!(migrated.body["target_host"], json!("server-b"));

        let status = status(
            &coordinator,
            StatusArgs {
                id: "task-1".into(),
                host: "server-b".into(),
            },
        )
        .await;
        assert_eq!(status.body["state"], json!("running"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_resume_is_flagged_as_orphaned() {
        let fleet = LocalFleet::standard();
        fleet.manager("server-a").start("task-1", "compute").unwrap();
        fleet.set_reachable("server-c", false);
        let coordinator = coordinator(&fleet);

        let output = migrate(
            &coordinator,
            MigrateArgs {
                id: "task-1".into(),
                from: "server-a".into(),
                to: "server-c".into(),
            },
        )
        .await;
        assert!(!output.success);
        assert_eq!(output.body["error"], json!("transport_failure"));
        assert_eq!(output.body["step"], json!("resume"));
        assert_eq!(output.body["orphaned_source"], json!(true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unknown_host_is_reported() {
        let fleet = LocalFleet::standard();
        let coordinator = coordinator(&fleet);
        let output = status(
            &coordinator,
            StatusArgs {
                id: "task-1".into(),
                host: "server-z".into(),
            },
        )
        .await;
        assert!(!output.success);
        assert_eq!(output.body["error"], json!("unknown_host"));
        assert_eq!(fleet.total_calls(), 0);
    }
}
