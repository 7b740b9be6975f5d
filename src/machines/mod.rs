//! The interlocking machines.
//!
//! Each machine is plain data (its variables, bound operation callback and
//! timing settings) implementing [`Machine`](crate::engine::Machine). The
//! behaviour lives in its transition table; the hardware side is reached only
//! through the machine's callback trait. Events are raised through the
//! `raise_*` methods each module adds to `Statechart<Machine>`.

pub mod config;
pub mod operating_mode;
pub mod route;
pub mod section;
pub mod signal;
pub mod signal_controller;
pub mod switch;
pub mod tracker;

pub use config::{Config, ConfigCallback, ConfigEvent, ConfigOutput, ConfigState};
pub use operating_mode::{
    Mode, OperatingMode, OperatingModeCallback, OperatingModeEvent, OperatingModeOutput,
    OperatingModeState,
};
pub use route::{Route, RouteCallback, RouteEvent, RouteOutput, RouteState};
pub use section::{Section, SectionCallback, SectionEvent, SectionOutput, SectionState};
pub use signal::{Signal, SignalCallback, SignalEvent, SignalOutput, SignalState};
pub use signal_controller::{
    SignalController, SignalControllerCallback, SignalControllerEvent, SignalControllerOutput,
    SignalControllerState,
};
pub use switch::{Switch, SwitchCallback, SwitchEvent, SwitchOutput, SwitchState};
pub use tracker::{Tracker, TrackerCallback, TrackerEvent, TrackerOutput, TrackerState};

use serde::{Deserialize, Serialize};

/// Signal aspect shown by a main, distant or shunting signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aspect {
    #[default]
    Stop,
    Go,
    Slow,
    Shunt,
    Off,
}
