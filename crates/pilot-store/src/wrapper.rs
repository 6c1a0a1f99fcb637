use chrono::{DateTime, Utc};
use pilot_core::RollbackState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Version of the on-disk envelope. Files with any other version are rejected.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetadata {
    pub schema_version: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// On-disk envelope around a [`RollbackState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateWrapper {
    pub metadata: StateMetadata,
    pub state: RollbackState,
}

impl StateWrapper {
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn new(state: RollbackState) -> serde_json::Result<Self> {
        let checksum = checksum(&state)?;
        Ok(Self {
            metadata: StateMetadata {
                schema_version: SCHEMA_VERSION.to_string(),
                checksum,
                created_at: state.started_at(),
                updated_at: state.updated_at(),
            },
            state,
        })
    }
}

/// Hex-encoded SHA-256 of the compact JSON encoding of `state`.
///
/// # Errors
///
/// Returns an error if the state cannot be serialized.
pub(crate) fn checksum(state: &RollbackState) -> serde_json::Result<String> {
    let bytes = serde_json::to_vec(state)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
