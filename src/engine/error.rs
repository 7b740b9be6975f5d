//! Runtime errors of the statechart engine.

use crate::checkpoint::CheckpointError;
use thiserror::Error;

/// Errors returned by `enter`, `run_cycle` and `resume`.
///
/// Domain failures never show up here; machines model them as `Failed`
/// states.
#[derive(Debug, Error)]
pub enum StatechartError {
    #[error("{machine} is not ready: timer service or operation callback not bound")]
    NotReady { machine: &'static str },

    #[error("{machine} did not stabilize within {limit} microsteps")]
    MicrostepLimit { machine: &'static str, limit: usize },

    #[error("{machine} is already active")]
    AlreadyActive { machine: &'static str },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
