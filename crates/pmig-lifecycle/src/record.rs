//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Per-host process lifecycle and snapshot store."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use pmig_snapshot::CapturedState;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumString};

/// Process type recorded when a restored snapshot does not carry one.
pub const UNKNOWN_PROCESS_TYPE: &str = "unknown";

/// Lifecycle state of a process id on one host.
///
/// `Absent` is never stored; it is what a lookup of a missing id reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Absent,
    Running,
    Paused,
}

/// Payload every freshly started process begins with.
pub fn initial_payload() -> serde_json::Value {
    json!({"progress": 0, "state": "initialized"})
}

/// Everything a host knows about one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: String,
    pub state: LifecycleState,
    pub process_type: String,
    pub created_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    /// Opaque progress owned by the unit logic.
    pub payload: serde_json::Value,
}

impl ProcessRecord {
    pub(crate) fn started(id: &str, process_type: &str) -> Self {
        Self {
            id: id.to_owned(),
            state: LifecycleState::Running,
            process_type: process_type.to_owned(),
            created_at: Utc::now(),
            paused_at: None,
            payload: initial_payload(),
        }
    }

    pub(crate) fn restored(id: &str, captured: CapturedState) -> Self {
        let process_type = captured
            .process_type
            .or_else(|| {
                captured
                    .payload
                    .get("type")
                    .and_then(|value| value.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| UNKNOWN_PROCESS_TYPE.to_owned());
        Self {
            id: id.to_owned(),
            state: LifecycleState::Running,
            process_type,
            created_at: Utc::now(),
            paused_at: None,
            payload: captured.payload,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }
}

/// Record the pause instant inside an object payload; other shapes are left alone.
pub(crate) fn stamp_paused_at(payload: &mut serde_json::Value, at: DateTime<Utc>) {
    if let Some(map) = payload.as_object_mut() {
        map.insert("paused_at".to_owned(), json!(at.to_rfc3339()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_record_is_running_with_initial_payload() {
        let record = ProcessRecord::started("task-1", "compute");
        assert!(record.is_running());
        assert_eq!(record.payload, initial_payload());
        assert!(record.paused_at.is_none());
    }

    #[test]
    fn restored_type_prefers_envelope_then_payload() {
        let explicit = CapturedState::new("a", Some("batch".into()), json!({"type": "session"}));
        assert_eq!(ProcessRecord::restored("a", explicit).process_type, "batch");

        let from_payload = CapturedState::new("b", None, json!({"type": "session"}));
        assert_eq!(
            ProcessRecord::restored("b", from_payload).process_type,
            "session"
        );

        let bare = CapturedState::new("c", None, json!([1, 2, 3]));
        assert_eq!(
            ProcessRecord::restored("c", bare).process_type,
            UNKNOWN_PROCESS_TYPE
        );
    }

    #[test]
    fn stamp_only_touches_objects() {
        let now = Utc::now();
        let mut object = json!({"progress": 1});
        stamp_paused_at(&mut object, now);
        assert_eq!(object["paused_at"], json!(now.to_rfc3339()));
        assert_eq!(object["progress"], json!(1));

        let mut scalar = json!(7);
        stamp_paused_at(&mut scalar, now);
        assert_eq!(scalar, json!(7));
    }

    #[test]
    fn states_render_lowercase() {
        assert_eq!(LifecycleState::Running.to_string(), "running");
        assert_eq!(
            "paused".parse::<LifecycleState>().unwrap(),
            LifecycleState::Paused
        );
    }
}
