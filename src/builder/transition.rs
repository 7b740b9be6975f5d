//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::engine::transition::{Action, Guard, Target, Transition, Trigger};
use crate::engine::{Machine, Runtime};
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
///
/// A transition without `.on(..)` is a completion transition, evaluated in
/// every microstep.
pub struct TransitionBuilder<M: Machine> {
    from: Option<M::State>,
    trigger: Option<Trigger<M::Event>>,
    guard: Option<Guard<M>>,
    target: Option<Target<M>>,
    effect: Option<Action<M>>,
}

impl<M: Machine> TransitionBuilder<M> {
    pub fn new() -> Self {
        Self {
            from: None,
            trigger: None,
            guard: None,
            target: None,
            effect: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: M::State) -> Self {
        self.from = Some(state);
        self
    }

    /// Set the triggering event matcher.
    pub fn on(mut self, trigger: Trigger<M::Event>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Add a guard predicate (optional).
    pub fn guard(mut self, guard: Guard<M>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&M, &Runtime<M>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Set the target state.
    pub fn to(mut self, state: M::State) -> Self {
        self.target = Some(Target::State(state));
        self
    }

    /// Route through a choice pseudostate.
    pub fn to_choice<F>(mut self, choice: F) -> Self
    where
        F: Fn(&M, &Runtime<M>) -> M::State + Send + Sync + 'static,
    {
        self.target = Some(Target::Choice(Arc::new(choice)));
        self
    }

    /// Make this an internal transition: only the effect runs.
    pub fn internal(mut self) -> Self {
        self.target = Some(Target::Internal);
        self
    }

    /// Action run between exiting the source and entering the target.
    pub fn effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut M, &mut Runtime<M>) + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition<M>, BuildError> {
        let source = self.from.ok_or(BuildError::MissingFromState)?;
        let target = self.target.ok_or(BuildError::MissingToState)?;

        Ok(Transition {
            source,
            trigger: self.trigger,
            guard: self.guard,
            target,
            effect: self.effect,
        })
    }
}

impl<M: Machine> Default for TransitionBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::test_support::{Door, DoorEvent, DoorState};

    #[test]
    fn builder_validates_required_fields() {
        let result = TransitionBuilder::<Door>::new()
            .from(DoorState::Closed)
            .build();

        assert!(matches!(result, Err(BuildError::MissingToState)));

        let result = TransitionBuilder::<Door>::new().to(DoorState::Open).build();
        assert!(matches!(result, Err(BuildError::MissingFromState)));
    }

    #[test]
    fn transition_builder_with_trigger() {
        let transition = TransitionBuilder::<Door>::new()
            .from(DoorState::Closed)
            .on(|e| matches!(e, DoorEvent::Push))
            .to(DoorState::Open)
            .build()
            .unwrap();

        assert_eq!(transition.source, DoorState::Closed);
        assert!(!transition.is_completion());
        assert!(matches!(transition.target, Target::State(DoorState::Open)));
        assert!(transition.effect.is_none());
    }

    #[test]
    fn transition_without_trigger_is_completion() {
        let transition = TransitionBuilder::<Door>::new()
            .from(DoorState::Open)
            .when(|door, _| door.pushes > 2)
            .to_choice(|_, _| DoorState::Closed)
            .effect(|door, _| door.pushes = 0)
            .build()
            .unwrap();

        assert!(transition.is_completion());
        assert!(transition.guard.is_some());
        assert!(matches!(transition.target, Target::Choice(_)));
        assert!(transition.effect.is_some());
    }
}
