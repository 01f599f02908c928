//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Per-host process lifecycle and snapshot store."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use chrono::Utc;
use pmig_logging::{log_system_event, pmig_debug, LogContext, SystemEventOutcome};
use pmig_snapshot::{decode_state, encode_state, CapturedState};

use crate::error::{LifecycleError, Result};
use crate::record::{stamp_paused_at, LifecycleState, ProcessRecord};
use crate::report::{HealthReport, ProcessAck, Snapshot, StatusReport, HEALTHY};
use crate::store::SnapshotStore;

/// Enforces the process state machine for one host.
///
/// ```text
/// Absent --start--> Running --pause--> Paused
///   ^                  ^                  |
///   +------resume------+------resume------+
/// ```
///
/// Start, Pause and Resume on the same id are mutually exclusive; the health
/// check never waits on them.
#[derive(Debug)]
pub struct LifecycleManager {
    host_name: String,
    store: SnapshotStore,
}

impl LifecycleManager {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            store: SnapshotStore::new(),
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Create a Running record. Never overwrites an existing id.
    pub fn start(&self, id: &str, process_type: &str) -> Result<ProcessAck> {
        require_id(id)?;
        let ctx = self.context(id).with_step("start");
        if let Err(err) = self
            .store
            .insert_new(ProcessRecord::started(id, process_type))
        {
            log_system_event(
                Some(&ctx),
                "process.start",
                &err.to_string(),
                SystemEventOutcome::Rejected,
            );
            return Err(err);
        }
        log_system_event(
            Some(&ctx),
            "process.start",
            &format!("started process of type {process_type}"),
            SystemEventOutcome::Success,
        );
        Ok(ProcessAck::started(id))
    }

    /// Freeze a Running process and hand out its encoded state.
    ///
    /// Stamping, encoding and the flip to Paused happen under one lock, so the
    /// returned bytes are exactly the payload at the moment of the transition.
    pub fn pause(&self, id: &str) -> Result<Snapshot> {
        let ctx = self.context(id).with_step("pause");
        let outcome = self.store.update(id, |record| {
            if record.state != LifecycleState::Running {
                return Err(LifecycleError::FailedPrecondition { id: id.to_owned() });
            }
            let paused_at = Utc::now();
            let mut payload = record.payload.clone();
            stamp_paused_at(&mut payload, paused_at);
            let captured = CapturedState {
                process_id: id.to_owned(),
                process_type: Some(record.process_type.clone()),
                payload,
                captured_at: paused_at,
            };
            let data = encode_state(&captured).map_err(|err| LifecycleError::Internal {
                id: id.to_owned(),
                reason: err.to_string(),
            })?;

            record.payload = captured.payload;
            record.paused_at = Some(paused_at);
            record.state = LifecycleState::Paused;
            Ok(Snapshot {
                id: id.to_owned(),
                data,
                state: LifecycleState::Paused,
            })
        });

        match &outcome {
            Ok(snapshot) => log_system_event(
                Some(&ctx),
                "process.pause",
                &format!("paused process, state size: {} bytes", snapshot.data.len()),
                SystemEventOutcome::Success,
            ),
            Err(err @ LifecycleError::Internal { .. }) => log_system_event(
                Some(&ctx),
                "process.pause",
                &err.to_string(),
                SystemEventOutcome::Fault,
            ),
            Err(err) => log_system_event(
                Some(&ctx),
                "process.pause",
                &err.to_string(),
                SystemEventOutcome::Rejected,
            ),
        }
        outcome
    }

    /// Restore a process from snapshot bytes, creating or overwriting its record.
    ///
    /// Decoding happens before the store is touched; undecodable bytes leave any
    /// existing record exactly as it was.
    pub fn resume(&self, id: &str, data: &[u8]) -> Result<ProcessAck> {
        let ctx = self.context(id).with_step("resume");
        let restored = require_id(id).and_then(|()| self.decode_for(id, data));
        let captured = match restored {
            Ok(captured) => captured,
            Err(err) => {
                log_system_event(
                    Some(&ctx),
                    "process.resume",
                    &err.to_string(),
                    SystemEventOutcome::Rejected,
                );
                return Err(err);
            }
        };

        let previous = self.store.replace(ProcessRecord::restored(id, captured));
        pmig_debug!(context = ctx, "resume replaced {previous} record");
        log_system_event(
            Some(&ctx),
            "process.resume",
            &format!("resumed process (previous state: {previous})"),
            SystemEventOutcome::Success,
        );
        Ok(ProcessAck::resumed(id))
    }

    pub fn status(&self, id: &str) -> Result<StatusReport> {
        match self.store.state_of(id) {
            LifecycleState::Absent => Err(LifecycleError::NotFound { id: id.to_owned() }),
            state => Ok(StatusReport {
                id: id.to_owned(),
                state,
                host: self.host_name.clone(),
                port: None,
            }),
        }
    }

    /// Liveness signal. Always succeeds.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: HEALTHY.to_owned(),
            host_name: self.host_name.clone(),
            running_count: self.store.running_count() as u64,
        }
    }

    fn decode_for(&self, id: &str, data: &[u8]) -> Result<CapturedState> {
        let captured = decode_state(data).map_err(|err| LifecycleError::InvalidArgument {
            id: id.to_owned(),
            reason: err.to_string(),
        })?;
        if captured.process_id != id {
            return Err(LifecycleError::InvalidArgument {
                id: id.to_owned(),
                reason: format!("snapshot belongs to process {}", captured.process_id),
            });
        }
        Ok(captured)
    }

    fn context<'a>(&'a self, id: &'a str) -> LogContext<'a> {
        LogContext::new()
            .with_process(id)
            .with_host(&self.host_name)
    }
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(LifecycleError::InvalidArgument {
            id: id.to_owned(),
            reason: "process id must not be empty".to_owned(),
        });
    }
    Ok(())
}
