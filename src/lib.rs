//! Run-to-completion statechart engine and the interlocking machines of a
//! model railway built on it.
//!
//! - [`core`]: states, the state vector, choices and history
//! - [`builder`]: `state_enum!` and the table builders
//! - [`engine`]: the generic RTC interpreter
//! - [`timer`]: the timer service boundary and a virtual clock
//! - [`machines`]: Config, OperatingMode, Route, Section, SignalController,
//!   Signal, Switch and Tracker

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod engine;
pub mod machines;
pub mod settings;
pub mod timer;
pub mod validation;

pub use crate::core::{State, StateHistory, StateTransition, StateVector};
pub use engine::{Machine, Statechart, StatechartError};
pub use settings::Settings;
