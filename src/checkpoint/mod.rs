//! Checkpoint and resume of a machine's configuration.
//!
//! A checkpoint captures the state vector, the transition history and some
//! bookkeeping. It does NOT include the machine's variables, its callbacks or
//! pending events: resuming restores where the machine was, and re-arms the
//! timers of the active states, without running entry actions.

use crate::core::{State, StateHistory, StateVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Bookkeeping tracked per machine instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineMetadata {
    /// When the instance was created
    pub created_at: DateTime<Utc>,

    /// When the checkpoint was taken
    pub updated_at: DateTime<Utc>,

    /// RTC cycles run so far
    pub cycles: u64,
}

impl Default for MachineMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            cycles: 0,
        }
    }
}

/// Serializable snapshot of one machine instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Checkpoint<S: State> {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// Name of the machine the checkpoint was taken from
    pub machine: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Active leaves, one per slot
    pub vector: StateVector<S>,

    /// Recent slot changes
    pub history: StateHistory<S>,

    pub metadata: MachineMetadata,
}

impl<S: State> Checkpoint<S> {
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.check_version()?;
        Ok(checkpoint)
    }

    /// Compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.check_version()?;
        Ok(checkpoint)
    }

    fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version == CHECKPOINT_VERSION {
            Ok(())
        } else {
            Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            })
        }
    }

    /// Check the snapshot fits a machine named `machine` with `regions`
    /// slots, and that every slot holds a leaf of that slot.
    pub fn validate(&self, machine: &str, regions: usize) -> Result<(), CheckpointError> {
        self.check_version()?;
        if self.machine != machine {
            return Err(CheckpointError::MachineMismatch {
                expected: machine.to_string(),
                found: self.machine.clone(),
            });
        }
        if self.vector.len() != regions {
            return Err(CheckpointError::SlotCount {
                expected: regions,
                found: self.vector.len(),
            });
        }
        for (slot, leaf) in self.vector.slots().iter().enumerate() {
            if let Some(leaf) = leaf {
                if !leaf.is_leaf() || leaf.slot() != slot {
                    return Err(CheckpointError::ValidationFailed(format!(
                        "{} cannot occupy slot {}",
                        leaf.name(),
                        slot
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum Lamp {
            Off,
            On,
            OnDim,
            OnBright,
        }
        composite: { On => OnBright }
        initial: { On => [OnDim] }
    }

    fn checkpoint(vector: StateVector<Lamp>) -> Checkpoint<Lamp> {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            machine: "Lamp".to_string(),
            timestamp: Utc::now(),
            vector,
            history: StateHistory::default(),
            metadata: MachineMetadata::default(),
        }
    }

    fn dim() -> StateVector<Lamp> {
        let mut vector = StateVector::new(1);
        vector.set(Lamp::OnDim);
        vector
    }

    #[test]
    fn json_roundtrip_keeps_vector() {
        let original = checkpoint(dim());
        let json = original.to_json().unwrap();
        let restored = Checkpoint::<Lamp>::from_json(&json).unwrap();

        assert_eq!(restored.vector, original.vector);
        assert_eq!(restored.id, original.id);
    }

    #[test]
    fn binary_form_is_accepted() {
        let original = checkpoint(dim());
        let bytes = original.to_bytes().unwrap();
        let restored = Checkpoint::<Lamp>::from_bytes(&bytes).unwrap();
        assert_eq!(restored.vector.get(0), Some(Lamp::OnDim));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut original = checkpoint(dim());
        original.version = CHECKPOINT_VERSION + 1;
        let json = original.to_json().unwrap();

        let result = Checkpoint::<Lamp>::from_json(&json);
        assert!(matches!(
            result,
            Err(CheckpointError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn garbage_fails_to_deserialize() {
        let result = Checkpoint::<Lamp>::from_json("{ not json");
        assert!(matches!(result, Err(CheckpointError::DeserializationFailed(_))));
    }

    #[test]
    fn validate_checks_machine_and_length() {
        let snapshot = checkpoint(dim());
        assert!(snapshot.validate("Lamp", 1).is_ok());
        assert!(matches!(
            snapshot.validate("Switch", 1),
            Err(CheckpointError::MachineMismatch { .. })
        ));
        assert!(matches!(
            snapshot.validate("Lamp", 2),
            Err(CheckpointError::SlotCount { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn validate_rejects_composite_in_slot() {
        let json = checkpoint(dim()).to_json().unwrap().replace("OnDim", "On");
        let snapshot = Checkpoint::<Lamp>::from_json(&json).unwrap();
        assert!(matches!(
            snapshot.validate("Lamp", 1),
            Err(CheckpointError::ValidationFailed(_))
        ));
    }
}
