//! Transition table entries.

use crate::engine::machine::Machine;
use crate::engine::runtime::Runtime;
use std::sync::Arc;

/// Event matcher; usually a `matches!` closure.
pub type Trigger<E> = fn(&E) -> bool;

/// Side-effecting entry, exit or transition action.
pub type Action<M> = Arc<dyn Fn(&mut M, &mut Runtime<M>) + Send + Sync>;

/// Choice pseudostate: routes to exactly one state.
pub type ChoiceFn<M> = Arc<dyn Fn(&M, &Runtime<M>) -> <M as Machine>::State + Send + Sync>;

/// Predicate over the machine data and the current event.
///
/// Guards must not have side effects; they may be evaluated for transitions
/// that end up not firing.
pub struct Guard<M: Machine> {
    predicate: Box<dyn Fn(&M, &Runtime<M>) -> bool + Send + Sync>,
}

impl<M: Machine> Guard<M> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&M, &Runtime<M>) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    pub fn check(&self, machine: &M, runtime: &Runtime<M>) -> bool {
        (self.predicate)(machine, runtime)
    }
}

/// Where a transition leads.
pub enum Target<M: Machine> {
    State(M::State),
    /// Evaluated after the source is exited and the effect has run.
    Choice(ChoiceFn<M>),
    /// Runs the effect only; the source is neither exited nor re-entered.
    Internal,
}

/// A guarded transition out of `source`.
///
/// Transitions without trigger are completion transitions: they are eligible
/// in every microstep, which is how joins and eventless choices are modelled.
pub struct Transition<M: Machine> {
    pub source: M::State,
    pub trigger: Option<Trigger<M::Event>>,
    pub guard: Option<Guard<M>>,
    pub target: Target<M>,
    pub effect: Option<Action<M>>,
}

impl<M: Machine> Transition<M> {
    /// Check if this transition is enabled by the current event and guard.
    pub fn can_execute(&self, machine: &M, runtime: &Runtime<M>) -> bool {
        let triggered = match (self.trigger, runtime.event()) {
            (None, _) => true,
            (Some(trigger), Some(event)) => trigger(event),
            (Some(_), None) => false,
        };

        triggered && self.guard.as_ref().map_or(true, |g| g.check(machine, runtime))
    }

    pub fn is_completion(&self) -> bool {
        self.trigger.is_none()
    }
}
