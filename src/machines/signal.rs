//! A single signal device.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::core::choice;
use crate::engine::{Machine, Statechart, StatechartError, Table};
use crate::machines::Aspect;
use crate::settings::{millis, SignalSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum SignalState {
        WaitForStart,
        Init,
        Operating,
        Idle,
        Turning,
        Failed,
    }
    composite: { Operating => Turning }
    initial: { Operating => [Idle] }
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalEvent {
    Start,
    Enable(Aspect),
    /// The device reports the requested aspect.
    Completed,
    Failed,
    Clear,
    InitTimeout,
    TurnTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalOutput {
    Completed,
    Failed,
}

pub trait SignalCallback: Send + Sync {
    fn send(&self, aspect: Aspect);
    /// True if the device does not show `aspect` yet.
    fn has_changed(&self, aspect: Aspect) -> bool;
    fn fail(&self);
}

pub struct Signal {
    callback: Option<Arc<dyn SignalCallback>>,
    settings: SignalSettings,
    aspect: Aspect,
}

impl Signal {
    pub fn new(settings: SignalSettings) -> Self {
        Self {
            callback: None,
            settings,
            aspect: Aspect::Stop,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn SignalCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn SignalCallback>) {
        self.callback = Some(callback);
    }

    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    fn call(&self, f: impl FnOnce(&dyn SignalCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn has_changed(&self) -> bool {
        self.callback
            .as_ref()
            .is_some_and(|cb| cb.has_changed(self.aspect))
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new(SignalSettings::default())
    }
}

type Edge = TransitionBuilder<Signal>;

impl Machine for Signal {
    type State = SignalState;
    type Event = SignalEvent;
    type Output = SignalOutput;

    const NAME: &'static str = "Signal";
    const REGIONS: usize = 1;
    const TIMERS: usize = 2;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use SignalState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(WaitForStart)
            .on_entry(Init, |signal, _| {
                signal.aspect = Aspect::Stop;
                signal.call(|cb| cb.send(Aspect::Stop));
            })
            .on_entry(Idle, |_, rt| rt.emit(SignalOutput::Completed))
            .on_entry(Turning, |signal, _| signal.call(|cb| cb.send(signal.aspect)))
            .on_entry(Failed, |signal, rt| {
                signal.call(|cb| cb.fail());
                rt.emit(SignalOutput::Failed);
            })
            .timer(Init, millis(self.settings.init_timeout_ms), SignalEvent::InitTimeout)
            .timer(Turning, millis(self.settings.turn_timeout_ms), SignalEvent::TurnTimeout)
            .transition(
                Edge::new()
                    .from(WaitForStart)
                    .on(|e| matches!(e, SignalEvent::Start))
                    .to(Init),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, SignalEvent::Completed))
                    .to(Operating),
            )?
            .transition(
                Edge::new()
                    .from(Idle)
                    .on(|e| matches!(e, SignalEvent::Enable(_)))
                    .to_choice(|signal, _| choice(|| signal.has_changed(), Turning).otherwise(Idle))
                    .effect(|signal, rt| {
                        if let Some(SignalEvent::Enable(aspect)) = rt.event() {
                            signal.aspect = *aspect;
                        }
                    }),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, SignalEvent::Completed))
                    .to(Idle),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, SignalEvent::InitTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Turning)
                    .on(|e| matches!(e, SignalEvent::TurnTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Failed)
                    .on(|e| matches!(e, SignalEvent::Clear))
                    .to(Init),
            )?;

        for source in [Init, Operating] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, SignalEvent::Failed))
                    .to(Failed),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<Signal> {
    pub fn raise_start(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalEvent::Start)
    }

    pub fn raise_enable(&mut self, aspect: Aspect) -> Result<(), StatechartError> {
        self.raise(SignalEvent::Enable(aspect))
    }

    pub fn raise_completed(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalEvent::Completed)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalEvent::Failed)
    }

    pub fn raise_clear(&mut self) -> Result<(), StatechartError> {
        self.raise(SignalEvent::Clear)
    }
}
