//! Builder for constructing transition tables.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::engine::table::{Table, TimerSpec};
use crate::engine::transition::{Action, ChoiceFn, Transition};
use crate::engine::{Machine, Runtime};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a machine's [`Table`] with a fluent API.
///
/// Transitions are kept in the order they are added; for one source state
/// that order is the guard evaluation order. Timers are numbered in the
/// order they are declared.
pub struct TableBuilder<M: Machine> {
    initial: Vec<M::State>,
    transitions: Vec<Transition<M>>,
    entries: HashMap<M::State, Vec<Action<M>>>,
    exits: HashMap<M::State, Vec<Action<M>>>,
    timers: Vec<TimerSpec<M>>,
    initial_choices: HashMap<M::State, ChoiceFn<M>>,
    duplicate_choice: Option<M::State>,
}

impl<M: Machine> TableBuilder<M> {
    pub fn new() -> Self {
        Self {
            initial: Vec::new(),
            transitions: Vec::new(),
            entries: HashMap::new(),
            exits: HashMap::new(),
            timers: Vec::new(),
            initial_choices: HashMap::new(),
            duplicate_choice: None,
        }
    }

    /// Add a top-level default state (required). Call once per top-level
    /// region.
    pub fn initial(mut self, state: M::State) -> Self {
        self.initial.push(state);
        self
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<M>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<M>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions(mut self, transitions: Vec<Transition<M>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn on_entry<F>(mut self, state: M::State, action: F) -> Self
    where
        F: Fn(&mut M, &mut Runtime<M>) + Send + Sync + 'static,
    {
        self.entries.entry(state).or_default().push(Arc::new(action));
        self
    }

    pub fn on_exit<F>(mut self, state: M::State, action: F) -> Self
    where
        F: Fn(&mut M, &mut Runtime<M>) + Send + Sync + 'static,
    {
        self.exits.entry(state).or_default().push(Arc::new(action));
        self
    }

    /// One-shot timer armed on entry of `state` and disarmed on its exit.
    pub fn timer(mut self, state: M::State, delay: Duration, event: M::Event) -> Self {
        self.timers.push(TimerSpec {
            state,
            delay,
            periodic: false,
            event,
        });
        self
    }

    pub fn periodic_timer(mut self, state: M::State, period: Duration, event: M::Event) -> Self {
        self.timers.push(TimerSpec {
            state,
            delay: period,
            periodic: true,
            event,
        });
        self
    }

    /// Replace the default entry of the region whose initial state is
    /// `default` by a choice.
    pub fn initial_choice<F>(mut self, default: M::State, choice: F) -> Self
    where
        F: Fn(&M, &Runtime<M>) -> M::State + Send + Sync + 'static,
    {
        if self
            .initial_choices
            .insert(default, Arc::new(choice))
            .is_some()
        {
            self.duplicate_choice = Some(default);
        }
        self
    }

    /// Build the table.
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<Table<M>, BuildError> {
        if self.initial.is_empty() {
            return Err(BuildError::MissingInitialState);
        }
        if let Some(state) = self.duplicate_choice {
            return Err(BuildError::DuplicateInitialChoice {
                state: state.name(),
            });
        }

        Ok(Table {
            initial: self.initial,
            transitions: self.transitions,
            entries: self.entries,
            exits: self.exits,
            timers: self.timers,
            initial_choices: self.initial_choices,
        })
    }
}

impl<M: Machine> Default for TableBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}
