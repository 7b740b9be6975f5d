//! State transition history tracking.
//!
//! Records every change of a state-vector slot, so a machine's recent
//! behaviour can be inspected or checkpointed.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single slot change.
///
/// `from == None` marks an entry into an empty slot, `to == None` an exit
/// that left the slot empty.
///
/// # Example
///
/// ```rust
/// use railchart::core::StateTransition;
/// use railchart::state_enum;
/// use chrono::Utc;
///
/// state_enum! {
///     enum Barrier { Up, Down }
/// }
///
/// let transition = StateTransition {
///     slot: 0,
///     from: Some(Barrier::Up),
///     to: Some(Barrier::Down),
///     timestamp: Utc::now(),
///     cycle: 1,
/// };
/// assert!(transition.from.is_some());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state-vector slot that changed
    pub slot: usize,
    /// The leaf previously in the slot
    pub from: Option<S>,
    /// The leaf now in the slot
    pub to: Option<S>,
    /// When the change happened
    pub timestamp: DateTime<Utc>,
    /// The RTC cycle that caused the change
    pub cycle: u64,
}

/// Bounded, ordered history of slot changes.
///
/// When `capacity` is reached the oldest record is dropped. A capacity of
/// zero disables recording.
///
/// # Example
///
/// ```rust
/// use railchart::core::{StateHistory, StateTransition};
/// use railchart::state_enum;
/// use chrono::Utc;
///
/// state_enum! {
///     enum Step { A, B, C }
/// }
///
/// let mut history = StateHistory::with_capacity(8);
/// for (from, to) in [(None, Some(Step::A)), (Some(Step::A), Some(Step::B))] {
///     history.record(StateTransition { slot: 0, from, to, timestamp: Utc::now(), cycle: 1 });
/// }
///
/// assert_eq!(history.get_path(0), vec![Step::A, Step::B]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    capacity: usize,
    transitions: VecDeque<StateTransition<S>>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}

impl<S: State> StateHistory<S> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            transitions: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&mut self, transition: StateTransition<S>) {
        if self.capacity == 0 {
            return;
        }
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// States that occupied `slot`, in order, skipping empty periods.
    pub fn get_path(&self, slot: usize) -> Vec<S> {
        let mut path = Vec::new();
        for transition in self.transitions.iter().filter(|t| t.slot == slot) {
            if path.is_empty() {
                if let Some(from) = transition.from {
                    path.push(from);
                }
            }
            if let Some(to) = transition.to {
                path.push(to);
            }
        }
        path
    }

    /// Time between the first and the last retained record.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &StateTransition<S>> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Initial,
            Processing,
            Complete,
        }
    }

    fn change(slot: usize, from: Option<TestState>, to: Option<TestState>) -> StateTransition<TestState> {
        StateTransition {
            slot,
            from,
            to,
            timestamp: Utc::now(),
            cycle: 1,
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history: StateHistory<TestState> = StateHistory::default();
        assert!(history.is_empty());
        assert!(history.get_path(0).is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let mut history = StateHistory::with_capacity(16);
        history.record(change(0, None, Some(TestState::Initial)));
        history.record(change(0, Some(TestState::Initial), Some(TestState::Processing)));
        history.record(change(1, None, Some(TestState::Complete)));
        history.record(change(0, Some(TestState::Processing), None));

        assert_eq!(
            history.get_path(0),
            vec![TestState::Initial, TestState::Processing]
        );
        assert_eq!(history.get_path(1), vec![TestState::Complete]);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut history = StateHistory::with_capacity(2);
        history.record(change(0, None, Some(TestState::Initial)));
        history.record(change(0, Some(TestState::Initial), Some(TestState::Processing)));
        history.record(change(0, Some(TestState::Processing), Some(TestState::Complete)));

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.get_path(0),
            vec![TestState::Initial, TestState::Processing, TestState::Complete]
        );
    }

    #[test]
    fn zero_capacity_disables_recording() {
        let mut history = StateHistory::with_capacity(0);
        history.record(change(0, None, Some(TestState::Initial)));
        assert!(history.is_empty());
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let mut history = StateHistory::with_capacity(4);
        history.record(change(0, None, Some(TestState::Initial)));
        std::thread::sleep(std::time::Duration::from_millis(10));
        history.record(change(0, Some(TestState::Initial), Some(TestState::Complete)));

        let duration = history.duration().unwrap();
        assert!(duration >= std::time::Duration::from_millis(10));
    }

    #[test]
    fn history_serializes_correctly() {
        let mut history = StateHistory::with_capacity(4);
        history.record(change(0, None, Some(TestState::Initial)));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<TestState> = serde_json::from_str(&json).unwrap();

        assert_eq!(history.len(), deserialized.len());
        assert_eq!(deserialized.capacity(), 4);
    }
}
