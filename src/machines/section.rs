//! Track section machine.
//!
//! Initialisation forks into two regions that race independently: `relay`
//! switches the section relay off and waits for the acknowledge, `state`
//! requests the occupation state. Once both are done the join enters
//! `Operating` in `Free` or `Occupied`.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::core::choice;
use crate::engine::{Machine, Runtime, Statechart, StatechartError, Table};
use crate::settings::{millis, SectionSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum SectionState {
        WaitForStart,
        Init,
        RelayPending,
        RelayDone,
        StatePending,
        StateDone,
        Operating,
        Free,
        Occupied,
        Locked,
        Failed,
    }
    composite: { Init => StateDone, Operating => Locked }
    initial: { Init => [RelayPending, StatePending], Operating => [Free] }
    slots: { 1 => [StatePending, StateDone] }
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionEvent {
    Start,
    RelayResponse,
    /// Occupation state answered after a request.
    StateResponse(bool),
    /// Occupation changed while operating.
    Occupation(bool),
    Lock,
    Unlock,
    Failed,
    Clear,
    InitTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionOutput {
    Started,
    Occupation(bool),
    Failed,
}

pub trait SectionCallback: Send + Sync {
    /// Energise the section relay.
    fn on(&self);
    fn off(&self);
    /// Ask for the occupation state; answered with `state_response`.
    fn request(&self);
    fn fail(&self);
}

pub struct Section {
    callback: Option<Arc<dyn SectionCallback>>,
    settings: SectionSettings,
    occupied: bool,
}

impl Section {
    pub fn new(settings: SectionSettings) -> Self {
        Self {
            callback: None,
            settings,
            occupied: false,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn SectionCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn SectionCallback>) {
        self.callback = Some(callback);
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    fn call(&self, f: impl FnOnce(&dyn SectionCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn occupation(&self) -> SectionState {
        choice(|| self.occupied, SectionState::Occupied).otherwise(SectionState::Free)
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new(SectionSettings::default())
    }
}

/// Store the payload of `StateResponse`/`Occupation`.
fn store_occupation(section: &mut Section, rt: &mut Runtime<Section>) {
    if let Some(SectionEvent::StateResponse(occupied) | SectionEvent::Occupation(occupied)) =
        rt.event()
    {
        section.occupied = *occupied;
    }
}

fn report_occupation(section: &mut Section, rt: &mut Runtime<Section>) {
    store_occupation(section, rt);
    rt.emit(SectionOutput::Occupation(section.occupied));
}

type Edge = TransitionBuilder<Section>;

impl Machine for Section {
    type State = SectionState;
    type Event = SectionEvent;
    type Output = SectionOutput;

    const NAME: &'static str = "Section";
    const REGIONS: usize = 2;
    const TIMERS: usize = 1;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use SectionState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(WaitForStart)
            .on_entry(RelayPending, |section, _| section.call(|cb| cb.off()))
            .on_entry(StatePending, |section, _| section.call(|cb| cb.request()))
            .on_entry(Locked, |section, _| section.call(|cb| cb.on()))
            .on_exit(Locked, |section, _| section.call(|cb| cb.off()))
            .on_entry(Failed, |section, rt| {
                section.call(|cb| cb.fail());
                rt.emit(SectionOutput::Failed);
            })
            .timer(Init, millis(self.settings.init_timeout_ms), SectionEvent::InitTimeout)
            .initial_choice(Free, |section, _| section.occupation())
            .transition(
                Edge::new()
                    .from(WaitForStart)
                    .on(|e| matches!(e, SectionEvent::Start))
                    .to(Init),
            )?
            .transition(
                Edge::new()
                    .from(RelayPending)
                    .on(|e| matches!(e, SectionEvent::RelayResponse))
                    .to(RelayDone),
            )?
            .transition(
                Edge::new()
                    .from(StatePending)
                    .on(|e| matches!(e, SectionEvent::StateResponse(_)))
                    .to(StateDone)
                    .effect(store_occupation),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .when(|_, rt| rt.is_state_active(RelayDone) && rt.is_state_active(StateDone))
                    .to(Operating)
                    .effect(|_, rt| rt.emit(SectionOutput::Started)),
            )?
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, SectionEvent::InitTimeout))
                    .to(Failed),
            )?
            .transition(
                Edge::new()
                    .from(Locked)
                    .on(|e| matches!(e, SectionEvent::Occupation(_)))
                    .internal()
                    .effect(report_occupation),
            )?
            .transition(
                Edge::new()
                    .from(Locked)
                    .on(|e| matches!(e, SectionEvent::Unlock))
                    .to_choice(|section, _| section.occupation()),
            )?
            .transition(
                Edge::new()
                    .from(Failed)
                    .on(|e| matches!(e, SectionEvent::Clear))
                    .to(Init),
            )?;

        for source in [Free, Occupied] {
            table = table
                .transition(
                    Edge::new()
                        .from(source)
                        .on(|e| matches!(e, SectionEvent::Occupation(_)))
                        .to_choice(|section, _| section.occupation())
                        .effect(report_occupation),
                )?
                .transition(
                    Edge::new()
                        .from(source)
                        .on(|e| matches!(e, SectionEvent::Lock))
                        .to(Locked),
                )?;
        }
        for source in [Init, Operating] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, SectionEvent::Failed))
                    .to(Failed),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<Section> {
    pub fn raise_start(&mut self) -> Result<(), StatechartError> {
        self.raise(SectionEvent::Start)
    }

    pub fn raise_relay_response(&mut self) -> Result<(), StatechartError> {
        self.raise(SectionEvent::RelayResponse)
    }

    pub fn raise_state_response(&mut self, occupied: bool) -> Result<(), StatechartError> {
        self.raise(SectionEvent::StateResponse(occupied))
    }

    pub fn raise_occupation(&mut self, occupied: bool) -> Result<(), StatechartError> {
        self.raise(SectionEvent::Occupation(occupied))
    }

    pub fn raise_lock(&mut self) -> Result<(), StatechartError> {
        self.raise(SectionEvent::Lock)
    }

    pub fn raise_unlock(&mut self) -> Result<(), StatechartError> {
        self.raise(SectionEvent::Unlock)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(SectionEvent::Failed)
    }

    pub fn raise_clear(&mut self) -> Result<(), StatechartError> {
        self.raise(SectionEvent::Clear)
    }
}
