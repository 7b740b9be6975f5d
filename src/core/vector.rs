//! Fixed-size state configuration vector.

use super::state::State;
use serde::{Deserialize, Serialize};

/// One slot per orthogonal region a machine may populate concurrently.
///
/// Each slot holds either `None` or exactly one leaf state belonging to that
/// slot. The length is fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateVector<S: State> {
    slots: Box<[Option<S>]>,
}

impl<S: State> StateVector<S> {
    pub fn new(regions: usize) -> Self {
        Self {
            slots: vec![None; regions].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<S> {
        self.slots.get(slot).copied().flatten()
    }

    /// Place a leaf in its own slot. Returns the previous occupant.
    pub(crate) fn set(&mut self, leaf: S) -> Option<S> {
        debug_assert!(leaf.is_leaf(), "only leaf states occupy slots");
        self.slots
            .get_mut(leaf.slot())
            .and_then(|slot| slot.replace(leaf))
    }

    pub(crate) fn clear(&mut self, slot: usize) -> Option<S> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub(crate) fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn slots(&self) -> &[Option<S>] {
        &self.slots
    }

    /// Active leaves in ascending slot order.
    pub fn leaves(&self) -> impl Iterator<Item = S> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// True if any slot is occupied.
    pub fn is_active(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// True if `state` or one of its descendants occupies a slot.
    pub fn is_state_active(&self, state: S) -> bool {
        self.leaves().any(|leaf| state.contains(&leaf))
    }

    /// True if `state` is final and the only occupied slot holds it.
    pub fn is_final(&self) -> bool {
        let mut leaves = self.leaves();
        matches!((leaves.next(), leaves.next()), (Some(leaf), None) if leaf.is_final())
    }

    /// Highest occupied slot holding a descendant of `state`.
    pub(crate) fn last_slot_of(&self, state: S) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .rev()
            .find(|(_, slot)| slot.is_some_and(|leaf| state.contains(&leaf)))
            .map(|(index, _)| index)
    }

    /// Active direct children of `state`, ordered by slot.
    pub(crate) fn active_children(&self, state: S) -> Vec<S> {
        let mut children: Vec<S> = Vec::new();
        for leaf in self.leaves() {
            if leaf == state || !state.contains(&leaf) {
                continue;
            }
            let mut child = leaf;
            while let Some(parent) = child.parent() {
                if parent == state {
                    break;
                }
                child = parent;
            }
            if !children.contains(&child) {
                children.push(child);
            }
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Idle,
            Running,
            RunningA,
            RunningB,
            Done,
        }
        composite: { Running => RunningB }
        initial: { Running => [RunningA, RunningB] }
        slots: { 1 => [RunningB] }
        final: [Done]
    }

    #[test]
    fn new_vector_is_inactive() {
        let vector: StateVector<TestState> = StateVector::new(2);
        assert_eq!(vector.len(), 2);
        assert!(!vector.is_active());
        assert!(!vector.is_final());
        assert_eq!(vector.get(0), None);
    }

    #[test]
    fn set_places_leaf_in_its_slot() {
        let mut vector = StateVector::new(2);
        vector.set(TestState::RunningB);
        assert_eq!(vector.get(1), Some(TestState::RunningB));
        assert_eq!(vector.get(0), None);
        assert!(vector.is_active());
    }

    #[test]
    fn composite_is_active_through_descendants() {
        let mut vector = StateVector::new(2);
        vector.set(TestState::RunningA);
        assert!(vector.is_state_active(TestState::Running));
        assert!(vector.is_state_active(TestState::RunningA));
        assert!(!vector.is_state_active(TestState::RunningB));
        assert!(!vector.is_state_active(TestState::Idle));
    }

    #[test]
    fn final_requires_sole_final_leaf() {
        let mut vector = StateVector::new(2);
        vector.set(TestState::Done);
        assert!(vector.is_final());

        vector.set(TestState::RunningB);
        assert!(!vector.is_final());
    }

    #[test]
    fn active_children_are_deduplicated() {
        let mut vector = StateVector::new(2);
        vector.set(TestState::RunningA);
        vector.set(TestState::RunningB);
        assert_eq!(
            vector.active_children(TestState::Running),
            vec![TestState::RunningA, TestState::RunningB]
        );
        assert_eq!(vector.last_slot_of(TestState::Running), Some(1));
    }

    #[test]
    fn clear_and_reset() {
        let mut vector = StateVector::new(2);
        vector.set(TestState::RunningA);
        vector.set(TestState::RunningB);
        assert_eq!(vector.clear(0), Some(TestState::RunningA));
        assert!(vector.is_active());
        vector.reset();
        assert!(!vector.is_active());
    }
}
