//! Core State trait for statechart states.
//!
//! A machine's states form a tree. Variants are declared depth-first, so the
//! descendants of a composite state occupy the contiguous ordinal range
//! `ordinal()..=last_descendant()`. All hierarchy queries are range checks over
//! that ordering.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for statechart states.
///
/// Implementations are normally generated by [`state_enum!`](crate::state_enum).
///
/// # Example
///
/// ```rust
/// use railchart::core::State;
/// use railchart::state_enum;
///
/// state_enum! {
///     pub enum Lamp {
///         Off,
///         On,
///         OnDim,
///         OnBright,
///     }
///     composite: { On => OnBright }
///     initial: { On => [OnDim] }
/// }
///
/// assert!(Lamp::On.contains(&Lamp::OnBright));
/// assert_eq!(Lamp::OnDim.parent(), Some(Lamp::On));
/// assert!(Lamp::Off.is_leaf());
/// ```
pub trait State:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &'static str;

    /// Every state of the machine in declaration (depth-first) order.
    fn all() -> &'static [Self];

    /// Position in the depth-first declaration order.
    fn ordinal(&self) -> usize;

    /// Ordinal of the last descendant; equal to `ordinal()` for leaves.
    fn last_descendant(&self) -> usize {
        self.ordinal()
    }

    /// Index of the state-vector slot this state's region starts at.
    ///
    /// For a leaf this is the slot it occupies. For a composite it is the slot
    /// of its first nested region, which is also the slot of the region the
    /// composite itself lives in.
    fn slot(&self) -> usize {
        0
    }

    /// Default-entry children of a composite state, one per orthogonal region.
    fn initial(&self) -> &'static [Self] {
        &[]
    }

    /// Check if this is the machine's final state.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }

    fn is_leaf(&self) -> bool {
        self.last_descendant() == self.ordinal()
    }

    /// True if `other` is this state or one of its descendants.
    fn contains(&self, other: &Self) -> bool {
        (self.ordinal()..=self.last_descendant()).contains(&other.ordinal())
    }

    /// Innermost composite state containing this one.
    fn parent(&self) -> Option<Self> {
        Self::all()
            .iter()
            .filter(|candidate| candidate.ordinal() != self.ordinal() && candidate.contains(self))
            .max_by_key(|candidate| candidate.ordinal())
            .copied()
    }

    /// Ancestors from the parent up to the top-level state.
    fn ancestors(&self) -> Vec<Self> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(state) = current {
            chain.push(state);
            current = state.parent();
        }
        chain
    }

    /// Direct children in declaration order.
    fn children(&self) -> Vec<Self> {
        Self::all()
            .iter()
            .filter(|candidate| candidate.parent().as_ref() == Some(self))
            .copied()
            .collect()
    }

    /// Leaf states reachable below (or equal to) this state.
    fn leaves(&self) -> Vec<Self> {
        Self::all()
            .iter()
            .filter(|candidate| candidate.is_leaf() && self.contains(candidate))
            .copied()
            .collect()
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
            RunningLeft,
            RunningLeftA,
            RunningLeftB,
            RunningRight,
            Failed,
        }
        composite: { Running => RunningRight, RunningLeft => RunningLeftB }
        initial: { Running => [RunningLeft, RunningRight], RunningLeft => [RunningLeftA] }
        slots: { 1 => [RunningRight] }
        error: [Failed]
    }

    #[test]
    fn ordinals_follow_declaration_order() {
        assert_eq!(TestState::Idle.ordinal(), 0);
        assert_eq!(TestState::Failed.ordinal(), 6);
        assert_eq!(TestState::all().len(), 7);
    }

    #[test]
    fn composite_range_contains_descendants() {
        assert!(TestState::Running.contains(&TestState::RunningLeftB));
        assert!(TestState::Running.contains(&TestState::RunningRight));
        assert!(!TestState::Running.contains(&TestState::Failed));
        assert!(!TestState::RunningLeft.contains(&TestState::RunningRight));
        assert!(TestState::Idle.contains(&TestState::Idle));
    }

    #[test]
    fn parent_is_innermost_container() {
        assert_eq!(TestState::RunningLeftA.parent(), Some(TestState::RunningLeft));
        assert_eq!(TestState::RunningLeft.parent(), Some(TestState::Running));
        assert_eq!(TestState::RunningRight.parent(), Some(TestState::Running));
        assert_eq!(TestState::Idle.parent(), None);
    }

    #[test]
    fn ancestors_walk_to_the_top() {
        assert_eq!(
            TestState::RunningLeftB.ancestors(),
            vec![TestState::RunningLeft, TestState::Running]
        );
    }

    #[test]
    fn children_and_leaves() {
        assert_eq!(
            TestState::Running.children(),
            vec![TestState::RunningLeft, TestState::RunningRight]
        );
        assert_eq!(
            TestState::Running.leaves(),
            vec![
                TestState::RunningLeftA,
                TestState::RunningLeftB,
                TestState::RunningRight
            ]
        );
    }

    #[test]
    fn slots_and_flags() {
        assert_eq!(TestState::RunningRight.slot(), 1);
        assert_eq!(TestState::RunningLeftA.slot(), 0);
        assert!(TestState::Failed.is_error());
        assert!(!TestState::Failed.is_final());
        assert!(!TestState::Running.is_leaf());
    }

    #[test]
    fn state_serializes_correctly() {
        let state = TestState::RunningLeftA;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
