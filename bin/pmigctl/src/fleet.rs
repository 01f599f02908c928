//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "binary"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Coordinator CLI driving a pmig fleet."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
//! Fleet-wide commands: health and the host registry.
use serde_json::json;

use crate::output::Output;
use crate::Coordinator;

/// Always succeeds; offline hosts are part of the report.
pub(crate) async fn health(coordinator: &Coordinator) -> Output {
    let health = coordinator.aggregator.fleet_health().await;
    let mut output = Output::success(&health);
    if let Some(body) = output.body.as_object_mut() {
        body.insert("online".into(), json!(health.online_count()));
        body.insert("total_running".into(), json!(health.total_running()));
    }
    output
}

pub(crate) fn hosts(coordinator: &Coordinator) -> Output {
    Output::success(&coordinator.registry.endpoints())
}
