//! Checkpoint error types.

use thiserror::Error;

/// Errors raised while saving, loading or resuming from a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The checkpoint was taken from a different machine.
    #[error("checkpoint belongs to {found}, not {expected}")]
    MachineMismatch { expected: String, found: String },

    #[error("expected {expected} slots, found {found}")]
    SlotCount { expected: usize, found: usize },

    /// A slot holds a composite, or a leaf of another slot.
    #[error("checkpoint validation failed: {0}")]
    ValidationFailed(String),
}
