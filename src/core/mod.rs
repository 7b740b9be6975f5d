//! Core statechart types.
//!
//! This module contains the data side of the execution model:
//! - State definitions via the `State` trait and their depth-first hierarchy
//! - The fixed-size state configuration vector
//! - Choice pseudostates
//! - Bounded transition history
//!
//! Nothing in here performs side effects; the RTC engine lives in
//! [`crate::engine`].

mod choice;
mod history;
mod state;
mod vector;

pub use choice::{choice, Choice};
pub use history::{StateHistory, StateTransition};
pub use state::State;
pub use vector::StateVector;
