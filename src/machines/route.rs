//! Life cycle of one route through the layout.
//!
//! A route is requested once, turns its switches and signals, stays active
//! until disabled and ends in the final state `Finished`. A rejected request
//! finishes at once.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::core::choice;
use crate::engine::{Machine, Statechart, StatechartError, Table};
use crate::settings::{millis, RouteSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum RouteState {
        Start,
        Turning,
        Active,
        Disabling,
        Failed,
        Finished,
    }
    final: [Finished]
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteEvent {
    Request,
    /// Every element of the route reported back.
    Completed,
    Disable,
    Failed,
    TurnTimeout,
    DisableTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutput {
    Activated,
    Failed,
    Finished,
}

pub trait RouteCallback: Send + Sync {
    /// True if no conflicting route holds any element of this one.
    fn valid(&self) -> bool;
    fn turn(&self);
    fn activate(&self);
    fn unlock(&self);
    fn fail(&self);
    fn finished(&self);
}

pub struct Route {
    callback: Option<Arc<dyn RouteCallback>>,
    settings: RouteSettings,
}

impl Route {
    pub fn new(settings: RouteSettings) -> Self {
        Self {
            callback: None,
            settings,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn RouteCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn RouteCallback>) {
        self.callback = Some(callback);
    }

    fn call(&self, f: impl FnOnce(&dyn RouteCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn is_valid(&self) -> bool {
        self.callback.as_ref().is_some_and(|cb| cb.valid())
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::new(RouteSettings::default())
    }
}

type Edge = TransitionBuilder<Route>;

impl Machine for Route {
    type State = RouteState;
    type Event = RouteEvent;
    type Output = RouteOutput;

    const NAME: &'static str = "Route";
    const REGIONS: usize = 1;
    const TIMERS: usize = 2;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use RouteState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(Start)
            .on_entry(Turning, |route, _| route.call(|cb| cb.turn()))
            .on_entry(Active, |route, rt| {
                route.call(|cb| cb.activate());
                rt.emit(RouteOutput::Activated);
            })
            .on_entry(Disabling, |route, _| route.call(|cb| cb.unlock()))
            .on_entry(Failed, |route, rt| {
                route.call(|cb| cb.fail());
                rt.emit(RouteOutput::Failed);
            })
            .on_entry(Finished, |route, rt| {
                route.call(|cb| cb.finished());
                rt.emit(RouteOutput::Finished);
            })
            .timer(Turning, millis(self.settings.turn_timeout_ms), RouteEvent::TurnTimeout)
            .timer(
                Disabling,
                millis(self.settings.disable_timeout_ms),
                RouteEvent::DisableTimeout,
            )
            .transition(
                Edge::new()
                    .from(Start)
                    .on(|e| matches!(e, RouteEvent::Request))
                    .to_choice(|route, _| choice(|| route.is_valid(), Turning).otherwise(Finished)),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, RouteEvent::Completed))
                    .to(Active),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, RouteEvent::TurnTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Active)
                    .on(|e| matches!(e, RouteEvent::Disable))
                    .to(Disabling),
            )?
            .transition(
                Edge::new()
                    .from(Disabling)
                    .on(|e| matches!(e, RouteEvent::Completed))
                    .to(Finished),
            )?
            .transition(
                Edge::new()
                    .from(Disabling)
                    .on(|e| matches!(e, RouteEvent::DisableTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Failed)
                    .on(|e| matches!(e, RouteEvent::Disable))
                    .to(Finished),
            )?;

        for source in [Turning, Active, Disabling] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, RouteEvent::Failed))
                    .to(Failed),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<Route> {
    pub fn raise_request(&mut self) -> Result<(), StatechartError> {
        self.raise(RouteEvent::Request)
    }

    pub fn raise_completed(&mut self) -> Result<(), StatechartError> {
        self.raise(RouteEvent::Completed)
    }

    pub fn raise_disable(&mut self) -> Result<(), StatechartError> {
        self.raise(RouteEvent::Disable)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(RouteEvent::Failed)
    }
}
