//! Declarative per-machine transition table.

use crate::engine::machine::Machine;
use crate::engine::transition::{Action, ChoiceFn, Transition};
use crate::timer::TimerId;
use std::collections::HashMap;
use std::time::Duration;

/// A timer armed while `state` is active.
pub struct TimerSpec<M: Machine> {
    pub state: M::State,
    pub delay: Duration,
    pub periodic: bool,
    /// Event queued when the timer fires.
    pub event: M::Event,
}

/// Everything the engine needs to interpret one machine.
///
/// Built with [`TableBuilder`](crate::builder::TableBuilder). Transitions keep
/// declaration order, which is also guard evaluation order.
pub struct Table<M: Machine> {
    pub(crate) initial: Vec<M::State>,
    pub(crate) transitions: Vec<Transition<M>>,
    pub(crate) entries: HashMap<M::State, Vec<Action<M>>>,
    pub(crate) exits: HashMap<M::State, Vec<Action<M>>>,
    pub(crate) timers: Vec<TimerSpec<M>>,
    pub(crate) initial_choices: HashMap<M::State, ChoiceFn<M>>,
}

impl<M: Machine> Table<M> {
    /// Default-entry states of the top level.
    pub fn initial(&self) -> &[M::State] {
        &self.initial
    }

    pub fn transitions(&self) -> &[Transition<M>] {
        &self.transitions
    }

    pub fn transitions_from(&self, state: M::State) -> impl Iterator<Item = &Transition<M>> {
        self.transitions.iter().filter(move |t| t.source == state)
    }

    pub(crate) fn entry_actions(&self, state: M::State) -> &[Action<M>] {
        self.entries.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn exit_actions(&self, state: M::State) -> &[Action<M>] {
        self.exits.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn timers(&self) -> &[TimerSpec<M>] {
        &self.timers
    }

    pub fn timers_of(&self, state: M::State) -> impl Iterator<Item = (TimerId, &TimerSpec<M>)> {
        self.timers
            .iter()
            .enumerate()
            .filter(move |(_, spec)| spec.state == state)
            .map(|(index, spec)| (TimerId(index), spec))
    }

    /// Choice replacing the default entry of a region whose initial state is `default`.
    pub(crate) fn initial_choice(&self, default: M::State) -> Option<&ChoiceFn<M>> {
        self.initial_choices.get(&default)
    }

    pub(crate) fn initial_choice_keys(&self) -> impl Iterator<Item = &M::State> {
        self.initial_choices.keys()
    }
}
