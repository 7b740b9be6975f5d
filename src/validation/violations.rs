//! Structural defects of a machine definition.

use thiserror::Error;

/// One defect found while validating a transition table against its state
/// hierarchy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelViolation {
    #[error("{state} lives in slot {slot} but the machine has {regions} regions")]
    SlotOutOfRange {
        state: &'static str,
        slot: usize,
        regions: usize,
    },

    #[error("composite state {state} has no initial children")]
    MissingInitial { state: &'static str },

    #[error("{child} is an initial state of {parent} but not its direct child")]
    InitialNotChild {
        parent: &'static str,
        child: &'static str,
    },

    #[error("region of {child} in {parent} has no initial state")]
    UncoveredRegion {
        parent: &'static str,
        child: &'static str,
    },

    #[error("{parent} declares two initial states for slot {slot}")]
    DuplicateRegion { parent: &'static str, slot: usize },

    #[error("{declared} timers declared, machine expects {expected}")]
    TimerCount { declared: usize, expected: usize },

    #[error("final state {state} must be a leaf")]
    FinalNotLeaf { state: &'static str },

    #[error("final state {state} has outgoing transitions")]
    FinalHasTransitions { state: &'static str },

    #[error("initial choice on {state}, which is no region's default state")]
    StrayInitialChoice { state: &'static str },
}
