//! The `Machine` trait: what a concrete statechart plugs into the engine.

use crate::builder::BuildError;
use crate::core::State;
use crate::engine::table::Table;
use std::fmt::Debug;

/// A concrete statechart: its data, its state/event/output types and its
/// declarative transition table.
///
/// The implementing type holds the machine's variables and its bound
/// collaborators (operation callbacks, settings). Actions and guards receive
/// it as their first argument.
pub trait Machine: Sized + Send + 'static {
    type State: State;
    type Event: Clone + Debug + Send + 'static;
    type Output: Clone + Debug + PartialEq + Send + 'static;

    /// Name used in logs, errors and checkpoints.
    const NAME: &'static str;

    /// Length of the state vector: orthogonal regions populated at once.
    const REGIONS: usize;

    /// Number of declared timers.
    const TIMERS: usize;

    /// Upper bound of timers armed at the same time. Documentation only.
    const MAX_ARMED: usize;

    /// Build the transition table.
    fn define(&self) -> Result<Table<Self>, BuildError>;

    /// True once every required operation callback is bound.
    fn check(&self) -> bool {
        true
    }
}
