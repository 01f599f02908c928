//! ---
//! pmig_section: "03-persistence-logging"
//! pmig_subsection: "module"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Snapshot envelope encoding for migrating process state."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Result, SnapshotError};

/// Current snapshot envelope version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Process state captured at pause time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedState {
    /// Identifier of the paused process.
    pub process_id: String,
    /// Kind of unit, carried so the receiving host can restore it.
    #[serde(default)]
    pub process_type: Option<String>,
    /// Arbitrary structured progress owned by the unit logic.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Timestamp when the state was captured.
    pub captured_at: DateTime<Utc>,
}

impl CapturedState {
    /// Construct a captured state record from raw components.
    pub fn new(
        process_id: impl Into<String>,
        process_type: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            process_id: process_id.into(),
            process_type,
            payload,
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    version: u16,
    created_at: DateTime<Utc>,
    hash: String,
    state: CapturedState,
}

#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    version: u16,
}

/// Encode captured state into self-describing CBOR bytes.
pub fn encode_state(state: &CapturedState) -> Result<Vec<u8>> {
    let envelope = SnapshotEnvelope {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        hash: compute_hash(state)?,
        state: state.clone(),
    };
    Ok(serde_cbor::to_vec(&envelope)?)
}

/// Decode bytes produced by [`encode_state`], checking version and integrity.
pub fn decode_state(bytes: &[u8]) -> Result<CapturedState> {
    let envelope = load_envelope(bytes)?;
    let expected = compute_hash(&envelope.state)?;
    if envelope.hash != expected {
        return Err(SnapshotError::HashMismatch);
    }
    Ok(envelope.state)
}

/// Verify the integrity of snapshot bytes without handing out the payload.
pub fn verify_bytes(bytes: &[u8]) -> bool {
    decode_state(bytes).is_ok()
}

fn load_envelope(bytes: &[u8]) -> Result<SnapshotEnvelope> {
    if bytes.is_empty() {
        return Err(SnapshotError::Empty);
    }
    let header: EnvelopeHeader = serde_cbor::from_slice(bytes)?;
    if header.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: header.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    Ok(serde_cbor::from_slice(bytes)?)
}

fn compute_hash(state: &CapturedState) -> Result<String> {
    let serialized = serde_json::to_vec(state)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}
