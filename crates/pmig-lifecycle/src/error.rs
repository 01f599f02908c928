//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Per-host process lifecycle and snapshot store."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Failure classes shared by hosts, the coordinator and the wire binding.
///
/// `UnknownHost` and `TransportFailure` are only ever produced on the calling
/// side; a host never reports them about itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    UnknownHost,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    InvalidArgument,
    TransportFailure,
    Internal,
}

/// Typed failures of the lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("process {id} already exists")]
    AlreadyExists { id: String },
    #[error("process {id} not found")]
    NotFound { id: String },
    #[error("process {id} is not running")]
    FailedPrecondition { id: String },
    #[error("failed to restore process {id}: {reason}")]
    InvalidArgument { id: String, reason: String },
    /// The snapshot encoder rejected the payload; the record is left Running.
    #[error("failed to capture process {id}: {reason}")]
    Internal { id: String, reason: String },
}

impl LifecycleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LifecycleError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            LifecycleError::NotFound { .. } => ErrorCode::NotFound,
            LifecycleError::FailedPrecondition { .. } => ErrorCode::FailedPrecondition,
            LifecycleError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            LifecycleError::Internal { .. } => ErrorCode::Internal,
        }
    }

    pub fn process_id(&self) -> &str {
        match self {
            LifecycleError::AlreadyExists { id }
            | LifecycleError::NotFound { id }
            | LifecycleError::FailedPrecondition { id }
            | LifecycleError::InvalidArgument { id, .. }
            | LifecycleError::Internal { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_in_snake_case() {
        assert_eq!(ErrorCode::FailedPrecondition.to_string(), "failed_precondition");
        assert_eq!(
            "unknown_host".parse::<ErrorCode>().unwrap(),
            ErrorCode::UnknownHost
        );
    }

    #[test]
    fn errors_expose_code_and_process() {
        let err = LifecycleError::InvalidArgument {
            id: "task-1".into(),
            reason: "snapshot is empty".into(),
        };
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.process_id(), "task-1");
        assert_eq!(
            err.to_string(),
            "failed to restore process task-1: snapshot is empty"
        );
    }
}
