//! Operating mode of the whole layout.
//!
//! `Running` holds two orthogonal regions: `operating` tracks whether the
//! interlocking accepts commands or is being edited, `blanking` turns the
//! display off after a period without user interaction. Both are entered and
//! left together but react to their own events.

use crate::builder::{simple_transition, BuildError, TableBuilder};
use crate::engine::{Machine, Statechart, StatechartError, Table};
use crate::settings::{millis, OperatingModeSettings};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

state_enum! {
    pub enum OperatingModeState {
        Running,
        Init,
        Disabled,
        Operating,
        Editing,
        Failed,
        Awake,
        Blanked,
    }
    composite: { Running => Blanked }
    initial: { Running => [Init, Awake] }
    slots: { 1 => [Awake, Blanked] }
    error: [Failed]
}

/// Mode reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Init,
    Disabled,
    Operating,
    Editing,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatingModeEvent {
    Started,
    Operate,
    Disable,
    Edit,
    Finish,
    Failed,
    Clear,
    /// User interaction; wakes the display.
    Touch,
    InitTimeout,
    BlankTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatingModeOutput {
    Mode(Mode),
    Blanked(bool),
}

pub trait OperatingModeCallback: Send + Sync {
    fn reset_transaction(&self);
    fn activate(&self);
    fn deactivate(&self);
    fn prepare_editing(&self);
    fn finish_editing(&self);
    fn fail(&self);
    fn blank(&self, blanked: bool);
}

pub struct OperatingMode {
    callback: Option<Arc<dyn OperatingModeCallback>>,
    settings: OperatingModeSettings,
}

impl OperatingMode {
    pub fn new(settings: OperatingModeSettings) -> Self {
        Self {
            callback: None,
            settings,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn OperatingModeCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn OperatingModeCallback>) {
        self.callback = Some(callback);
    }

    fn call(&self, f: impl FnOnce(&dyn OperatingModeCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::new(OperatingModeSettings::default())
    }
}

impl Machine for OperatingMode {
    type State = OperatingModeState;
    type Event = OperatingModeEvent;
    type Output = OperatingModeOutput;

    const NAME: &'static str = "OperatingMode";
    const REGIONS: usize = 2;
    const TIMERS: usize = 2;
    const MAX_ARMED: usize = 2;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use OperatingModeEvent as Ev;
        use OperatingModeState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(Running)
            .on_entry(Init, |mode, rt| {
                mode.call(|cb| cb.reset_transaction());
                rt.emit(OperatingModeOutput::Mode(Mode::Init));
            })
            .on_entry(Disabled, |mode, rt| {
                mode.call(|cb| cb.deactivate());
                rt.emit(OperatingModeOutput::Mode(Mode::Disabled));
            })
            .on_entry(Operating, |mode, rt| {
                mode.call(|cb| cb.activate());
                rt.emit(OperatingModeOutput::Mode(Mode::Operating));
            })
            .on_entry(Editing, |mode, rt| {
                mode.call(|cb| cb.prepare_editing());
                rt.emit(OperatingModeOutput::Mode(Mode::Editing));
            })
            .on_exit(Editing, |mode, _| mode.call(|cb| cb.finish_editing()))
            .on_entry(Failed, |mode, rt| {
                mode.call(|cb| cb.fail());
                rt.emit(OperatingModeOutput::Mode(Mode::Failed));
            })
            .on_entry(Blanked, |mode, rt| {
                mode.call(|cb| cb.blank(true));
                rt.emit(OperatingModeOutput::Blanked(true));
            })
            .on_exit(Blanked, |mode, rt| {
                mode.call(|cb| cb.blank(false));
                rt.emit(OperatingModeOutput::Blanked(false));
            })
            .timer(Init, millis(self.settings.init_timeout_ms), Ev::InitTimeout)
            .timer(Awake, millis(self.settings.blank_timeout_ms), Ev::BlankTimeout)
            .transitions(vec![
                simple_transition::<Self>(Init, |e| matches!(e, Ev::Started), Disabled),
                simple_transition::<Self>(Init, |e| matches!(e, Ev::InitTimeout), Failed),
                simple_transition::<Self>(Disabled, |e| matches!(e, Ev::Operate), Operating),
                simple_transition::<Self>(Disabled, |e| matches!(e, Ev::Edit), Editing),
                simple_transition::<Self>(Operating, |e| matches!(e, Ev::Disable), Disabled),
                simple_transition::<Self>(Editing, |e| matches!(e, Ev::Finish), Init),
                simple_transition::<Self>(Failed, |e| matches!(e, Ev::Clear), Init),
                simple_transition::<Self>(Awake, |e| matches!(e, Ev::BlankTimeout), Blanked),
                simple_transition::<Self>(Awake, |e| matches!(e, Ev::Touch), Awake),
                simple_transition::<Self>(Blanked, |e| matches!(e, Ev::Touch), Awake),
            ]);

        for source in [Init, Disabled, Operating, Editing] {
            table = table.add_transition(simple_transition::<Self>(
                source,
                |e| matches!(e, Ev::Failed),
                Failed,
            ));
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<OperatingMode> {
    pub fn raise_started(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Started)
    }

    pub fn raise_operate(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Operate)
    }

    pub fn raise_disable(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Disable)
    }

    pub fn raise_edit(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Edit)
    }

    pub fn raise_finish(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Finish)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Failed)
    }

    pub fn raise_clear(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Clear)
    }

    pub fn raise_touch(&mut self) -> Result<(), StatechartError> {
        self.raise(OperatingModeEvent::Touch)
    }
}
