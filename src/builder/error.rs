//! Build errors for tables and transitions.

use crate::validation::ModelViolation;
use thiserror::Error;

/// Errors that can occur when building a machine's transition table.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition target not specified. Call .to(state), .to_choice(f) or .internal()")]
    MissingToState,

    #[error("Region default {state} already has an initial choice")]
    DuplicateInitialChoice { state: &'static str },

    #[error("{machine} is not a valid model ({} violations)", .violations.len())]
    InvalidModel {
        machine: &'static str,
        violations: Vec<ModelViolation>,
    },
}
