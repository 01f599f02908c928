//! ---
//! pmig_section: "03-persistence-logging"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Snapshot envelope encoding for migrating process state."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Snapshot envelopes exchanged between hosts during a migration.
//!
//! The bytes produced here are opaque to the transport and to the
//! coordinator; only [`decode_state`] on the receiving host looks inside.

/// Result alias used throughout the snapshot crate.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Error type for the snapshot codec.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The caller handed over zero bytes.
    #[error("snapshot is empty")]
    Empty,
    /// Wrapper for JSON serialization issues while hashing.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for CBOR encoding or decoding issues.
    #[error("cbor serialization error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    /// The envelope was produced by an incompatible encoder.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the envelope.
        found: u16,
        /// Version this build understands.
        expected: u16,
    },
    /// Reported when a snapshot fails integrity verification.
    #[error("snapshot hash mismatch")]
    HashMismatch,
}

pub mod snapshot;

pub use snapshot::{decode_state, encode_state, verify_bytes, CapturedState, SNAPSHOT_VERSION};
