//! Switch (turnout) machine.
//!
//! After `inquire` the switch asks the hardware for its position and settles
//! in `Left` or `Right`. Turning commands the motor and waits for the
//! position response; a missing response within the turn timeout fails the
//! switch. A locked switch ignores turn commands.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::core::choice;
use crate::engine::{Machine, Statechart, StatechartError, Table};
use crate::settings::{millis, SwitchSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum SwitchState {
        WaitForStart,
        Init,
        Operating,
        Unlocked,
        Left,
        Right,
        Turning,
        TurningLeft,
        TurningRight,
        Locked,
        Failed,
    }
    composite: { Operating => Locked, Unlocked => Right, Turning => TurningRight }
    initial: { Operating => [Unlocked], Unlocked => [Left], Turning => [TurningLeft] }
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchEvent {
    Inquire,
    /// Position reported by the hardware.
    Response,
    TurnLeft,
    TurnRight,
    Lock,
    Unlock,
    Failed,
    Clear,
    InitTimeout,
    TurnTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchOutput {
    /// Initial position known.
    Inquired,
    Turned,
    Failed,
}

/// Hardware side of a switch.
pub trait SwitchCallback: Send + Sync {
    /// Ask for the current position; answered with `response`.
    fn request(&self);
    fn left(&self);
    fn right(&self);
    fn lock(&self);
    fn unlock(&self);
    fn fail(&self);
    fn is_turned_left(&self) -> bool;
}

pub struct Switch {
    callback: Option<Arc<dyn SwitchCallback>>,
    settings: SwitchSettings,
}

impl Switch {
    pub fn new(settings: SwitchSettings) -> Self {
        Self {
            callback: None,
            settings,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn SwitchCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn SwitchCallback>) {
        self.callback = Some(callback);
    }

    fn call(&self, f: impl FnOnce(&dyn SwitchCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn is_turned_left(&self) -> bool {
        self.callback
            .as_ref()
            .is_some_and(|callback| callback.is_turned_left())
    }

    fn position(&self) -> SwitchState {
        choice(|| self.is_turned_left(), SwitchState::Left).otherwise(SwitchState::Right)
    }
}

impl Default for Switch {
    fn default() -> Self {
        Self::new(SwitchSettings::default())
    }
}

type Edge = TransitionBuilder<Switch>;

impl Machine for Switch {
    type State = SwitchState;
    type Event = SwitchEvent;
    type Output = SwitchOutput;

    const NAME: &'static str = "Switch";
    const REGIONS: usize = 1;
    const TIMERS: usize = 2;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use SwitchState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(WaitForStart)
            .on_entry(Init, |sw, _| sw.call(|cb| cb.request()))
            .on_entry(TurningLeft, |sw, _| sw.call(|cb| cb.left()))
            .on_entry(TurningRight, |sw, _| sw.call(|cb| cb.right()))
            .on_entry(Locked, |sw, _| sw.call(|cb| cb.lock()))
            .on_exit(Locked, |sw, _| sw.call(|cb| cb.unlock()))
            .on_entry(Failed, |sw, rt| {
                sw.call(|cb| cb.fail());
                rt.emit(SwitchOutput::Failed);
            })
            .timer(Init, millis(self.settings.init_timeout_ms), SwitchEvent::InitTimeout)
            .timer(Turning, millis(self.settings.turn_timeout_ms), SwitchEvent::TurnTimeout)
            .initial_choice(Left, |sw, _| sw.position())
            .transition(
                Edge::new()
                    .from(WaitForStart)
                    .on(|e| matches!(e, SwitchEvent::Inquire))
                    .to(Init),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, SwitchEvent::Response))
                    .to(Operating)
                    .effect(|_, rt| rt.emit(SwitchOutput::Inquired)),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, SwitchEvent::InitTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Unlocked)
                    .on(|e| matches!(e, SwitchEvent::TurnLeft))
                    .when(|sw, _| sw.is_turned_left())
                    .to(Left)
                    .effect(|_, rt| rt.emit(SwitchOutput::Turned)),
            )?
            .transition(
                Edge::new()
                    .from(Unlocked)
                    .on(|e| matches!(e, SwitchEvent::TurnLeft))
                    .to(TurningLeft),
            )?
            .transition(
                Edge::new()
                    .from(Unlocked)
                    .on(|e| matches!(e, SwitchEvent::TurnRight))
                    .when(|sw, _| !sw.is_turned_left())
                    .to(Right)
                    .effect(|_, rt| rt.emit(SwitchOutput::Turned)),
            )?
            .transition(
                Edge::new()
                    .from(Unlocked)
                    .on(|e| matches!(e, SwitchEvent::TurnRight))
                    .to(TurningRight),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, SwitchEvent::Response))
                    .to(Unlocked)
                    .effect(|_, rt| rt.emit(SwitchOutput::Turned)),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, SwitchEvent::TurnTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Unlocked)
                    .on(|e| matches!(e, SwitchEvent::Lock))
                    .to(Locked),
            )?
            .transition(
                Edge::new()
                    .from(Locked)
                    .on(|e| matches!(e, SwitchEvent::Unlock))
                    .to(Unlocked),
            )?
            .transition(
                Edge::new()
                    .from(Failed)
                    .on(|e| matches!(e, SwitchEvent::Clear))
                    .to(Init),
            )?;

        for source in [WaitForStart, Init, Operating] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, SwitchEvent::Failed))
                    .to(Failed),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<Switch> {
    pub fn raise_inquire(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::Inquire)
    }

    pub fn raise_response(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::Response)
    }

    pub fn raise_turn_left(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::TurnLeft)
    }

    pub fn raise_turn_right(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::TurnRight)
    }

    pub fn raise_lock(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::Lock)
    }

    pub fn raise_unlock(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::Unlock)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::Failed)
    }

    pub fn raise_clear(&mut self) -> Result<(), StatechartError> {
        self.raise(SwitchEvent::Clear)
    }
}
