//! Snapshots of a machine's present position.
//!
//! A snapshot records where a machine is (its current state, whether it was
//! running and which modules were attached), not how it got there. It can be
//! written as JSON or compact binary and fed back through
//! [`MachineBuilder::resume`](crate::builder::MachineBuilder::resume) after a
//! restart. Sequences and modules are code, not data, and are configured
//! again on the builder.

use crate::core::State;
use crate::machine::StateMachine;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable record of a machine's position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: DeserializeOwned"))]
pub struct Snapshot<S: State> {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// Id of the machine the snapshot was taken from
    pub machine: Uuid,

    /// Label of that machine
    pub label: String,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// State that was current
    pub current_state: S,

    /// Whether the machine was running
    pub running: bool,

    /// Names of attached modules, in registration order
    pub modules: Vec<String>,
}

impl<S: State> Snapshot<S> {
    /// Check that this crate can resume from the snapshot.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(())
    }
}

impl<S: State + Serialize + DeserializeOwned> Snapshot<S> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl<S: State> StateMachine<S> {
    /// Record the machine's present position.
    ///
    /// An in-flight transition is not captured; the snapshot holds the last
    /// committed state.
    pub fn snapshot(&self) -> Snapshot<S> {
        let (current_state, running, modules) = self.position();
        Snapshot {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            machine: self.id(),
            label: self.label().to_string(),
            taken_at: Utc::now(),
            current_state,
            running,
            modules,
        }
    }
}
