//! Versioned binary snapshots of a committed DAO state.

use crate::error::GovernanceError;
use crate::state::DaoState;
use dao_types::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Current snapshot encoding. Bump on any layout change.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Everything needed to resume a DAO: the full state plus when it was taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoSnapshot<L> {
    pub taken_at: Timestamp,
    pub state: DaoState<L>,
}

impl<L: Serialize + DeserializeOwned> DaoSnapshot<L> {
    pub fn new(state: DaoState<L>, taken_at: Timestamp) -> Self {
        Self { taken_at, state }
    }

    /// Version byte followed by the bincode body.
    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        let mut out = vec![SNAPSHOT_VERSION];
        bincode::serialize_into(&mut out, self)
            .map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GovernanceError> {
        let (version, body) = bytes
            .split_first()
            .ok_or_else(|| GovernanceError::Snapshot("empty snapshot".into()))?;
        if *version != SNAPSHOT_VERSION {
            return Err(GovernanceError::Snapshot(format!(
                "unsupported snapshot version {version} (expected {SNAPSHOT_VERSION})"
            )));
        }
        bincode::deserialize(body).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }
}
