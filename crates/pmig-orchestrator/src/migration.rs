//! ---
//! pmig_section: "04-configuration-orchestration"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Pause/resume hand-off of a process between two hosts."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pmig_common::{HostEndpoint, HostRegistry};
use pmig_lifecycle::{ErrorCode, ProcessAck, StatusReport};
use pmig_logging::{log_system_event, pmig_info, LogContext, SystemEventOutcome};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::journal::{MigrationJournal, MigrationStep};
use crate::transport::{bounded, HostTransport, RpcError};

/// Caller-side deadline applied to every remote call unless overridden.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a completed hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migration_id: Uuid,
    pub process_id: String,
    pub source_host: String,
    pub target_host: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A host name is missing from the registry; no call was made.
    #[error("unknown host '{host}'")]
    UnknownHost { host: String },
    /// Pause on the source failed; the target was never contacted.
    #[error("migration {migration_id} of {process_id} failed at pause on {source_host}: {cause}")]
    PauseFailed {
        migration_id: Uuid,
        process_id: String,
        source_host: String,
        target_host: String,
        cause: RpcError,
    },
    /// Resume on the target failed after a successful pause.
    ///
    /// The record on the source host stays Paused. Nothing rolls it back.
    #[error(
        "migration {migration_id} of {process_id} failed at resume on {target_host}: {cause}; \
         process left paused on {source_host}"
    )]
    ResumeFailed {
        migration_id: Uuid,
        process_id: String,
        source_host: String,
        target_host: String,
        cause: RpcError,
    },
}

impl MigrationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MigrationError::UnknownHost { .. } => ErrorCode::UnknownHost,
            MigrationError::PauseFailed { cause, .. }
            | MigrationError::ResumeFailed { cause, .. } => cause.code(),
        }
    }

    /// Protocol step that failed, if any call was made.
    pub fn step(&self) -> Option<MigrationStep> {
        match self {
            MigrationError::UnknownHost { .. } => None,
            MigrationError::PauseFailed { .. } => Some(MigrationStep::Pause),
            MigrationError::ResumeFailed { .. } => Some(MigrationStep::Resume),
        }
    }

    pub fn migration_id(&self) -> Option<Uuid> {
        match self {
            MigrationError::UnknownHost { .. } => None,
            MigrationError::PauseFailed { migration_id, .. }
            | MigrationError::ResumeFailed { migration_id, .. } => Some(*migration_id),
        }
    }

    /// True when a Paused record was left behind on the source host.
    pub fn leaves_orphan(&self) -> bool {
        matches!(self, MigrationError::ResumeFailed { .. })
    }
}

/// Failure of a single-host coordinator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown host '{host}'")]
    UnknownHost { host: String },
    #[error("call to {host} failed: {cause}")]
    Rpc { host: String, cause: RpcError },
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::UnknownHost { .. } => ErrorCode::UnknownHost,
            DispatchError::Rpc { cause, .. } => cause.code(),
        }
    }
}

/// Sequences Pause and Resume across two registered hosts.
pub struct MigrationOrchestrator {
    registry: Arc<HostRegistry>,
    transport: Arc<dyn HostTransport>,
    call_timeout: Duration,
    journal: MigrationJournal,
}

impl std::fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("hosts", &self.registry.len())
            .field("call_timeout", &self.call_timeout)
            .field("journal", &self.journal.len())
            .finish()
    }
}

impl MigrationOrchestrator {
    pub fn new(registry: Arc<HostRegistry>, transport: Arc<dyn HostTransport>) -> Self {
        Self {
            registry,
            transport,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            journal: MigrationJournal::default(),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_journal_capacity(mut self, capacity: usize) -> Self {
        self.journal = MigrationJournal::new(capacity);
        self
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    pub fn journal(&self) -> &MigrationJournal {
        &self.journal
    }

    /// Move `id` from `source` to `target`.
    ///
    /// Both names are resolved before any call is made. Pause runs first and
    /// its bytes are handed to Resume unmodified. A Resume failure is reported
    /// but the source record stays Paused.
    pub async fn migrate(
        &self,
        id: &str,
        source: &str,
        target: &str,
    ) -> Result<MigrationReport, MigrationError> {
        let unknown = |host: &str| MigrationError::UnknownHost {
            host: host.to_owned(),
        };
        let source_host = self.registry.resolve(source).ok_or_else(|| unknown(source))?;
        let target_host = self.registry.resolve(target).ok_or_else(|| unknown(target))?;

        let migration_id = self.journal.begin(id, source, target);
        let ctx = LogContext::new()
            .with_process(id)
            .with_host(source)
            .with_peer(target);
        pmig_info!(context = ctx, "migration {migration_id} started");
        self.journal.mark_in_progress(migration_id);

        let pause_ctx = ctx.clone().with_step("pause");
        let snapshot = match bounded(
            self.call_timeout,
            self.transport.pause_process(&source_host, id),
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(cause) => {
                self.journal
                    .fail(migration_id, MigrationStep::Pause, cause.to_string());
                log_system_event(
                    Some(&pause_ctx),
                    "migration.pause",
                    &cause.to_string(),
                    SystemEventOutcome::Rejected,
                );
                return Err(MigrationError::PauseFailed {
                    migration_id,
                    process_id: id.to_owned(),
                    source_host: source.to_owned(),
                    target_host: target.to_owned(),
                    cause,
                });
            }
        };
        pmig_info!(
            context = pause_ctx,
            "paused on source, handing {} bytes to target",
            snapshot.data.len()
        );

        let resume_ctx = ctx.clone().with_step("resume");
        if let Err(cause) = bounded(
            self.call_timeout,
            self.transport
                .resume_process(&target_host, id, snapshot.data),
        )
        .await
        {
            self.journal
                .fail(migration_id, MigrationStep::Resume, cause.to_string());
            log_system_event(
                Some(&resume_ctx),
                "migration.resume",
                &format!("{cause}; process left paused on {source}"),
                SystemEventOutcome::Fault,
            );
            return Err(MigrationError::ResumeFailed {
                migration_id,
                process_id: id.to_owned(),
                source_host: source.to_owned(),
                target_host: target.to_owned(),
                cause,
            });
        }

        self.journal.complete(migration_id);
        log_system_event(
            Some(&ctx),
            "migration.complete",
            &format!("migration {migration_id} completed"),
            SystemEventOutcome::Success,
        );
        Ok(MigrationReport {
            migration_id,
            process_id: id.to_owned(),
            source_host: source.to_owned(),
            target_host: target.to_owned(),
            completed_at: Utc::now(),
        })
    }

    pub async fn start_process(
        &self,
        id: &str,
        process_type: &str,
        host: &str,
    ) -> Result<ProcessAck, DispatchError> {
        let endpoint = self.resolve(host)?;
        bounded(
            self.call_timeout,
            self.transport.start_process(&endpoint, id, process_type),
        )
        .await
        .map_err(|cause| DispatchError::Rpc {
            host: host.to_owned(),
            cause,
        })
    }

    pub async fn process_status(&self, id: &str, host: &str) -> Result<StatusReport, DispatchError> {
        let endpoint = self.resolve(host)?;
        bounded(self.call_timeout, self.transport.get_status(&endpoint, id))
            .await
            .map_err(|cause| DispatchError::Rpc {
                host: host.to_owned(),
                cause,
            })
    }

    fn resolve(&self, name: &str) -> Result<HostEndpoint, DispatchError> {
        self.registry
            .resolve(name)
            .ok_or_else(|| DispatchError::UnknownHost {
                host: name.to_owned(),
            })
    }
}
