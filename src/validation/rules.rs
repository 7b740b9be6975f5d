//! Model checks, accumulated with `Validation`.

use crate::core::State;
use crate::engine::{Machine, Table};
use crate::validation::violations::ModelViolation;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ModelViolation>>;

fn check(ok: bool, violation: impl FnOnce() -> ModelViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Validate a table against its machine, collecting every violation.
pub fn validate<M: Machine>(table: &Table<M>) -> Validation<(), NonEmptyVec<ModelViolation>> {
    let mut checks: Vec<Check> = Vec::new();

    checks.push(check(table.timers().len() == M::TIMERS, || {
        ModelViolation::TimerCount {
            declared: table.timers().len(),
            expected: M::TIMERS,
        }
    }));

    for &state in M::State::all() {
        if state.is_leaf() {
            checks.push(check(state.slot() < M::REGIONS, || {
                ModelViolation::SlotOutOfRange {
                    state: state.name(),
                    slot: state.slot(),
                    regions: M::REGIONS,
                }
            }));
        } else {
            checks.extend(composite_checks(state));
        }

        if state.is_final() {
            checks.push(check(state.is_leaf(), || ModelViolation::FinalNotLeaf {
                state: state.name(),
            }));
            checks.push(check(table.transitions_from(state).next().is_none(), || {
                ModelViolation::FinalHasTransitions {
                    state: state.name(),
                }
            }));
        }
    }

    for &state in table.initial_choice_keys() {
        let is_default = table.initial().contains(&state)
            || state
                .parent()
                .is_some_and(|parent| parent.initial().contains(&state));
        checks.push(check(is_default, || ModelViolation::StrayInitialChoice {
            state: state.name(),
        }));
    }

    Validation::all_vec(checks).map(|_| ())
}

fn composite_checks<S: State>(state: S) -> Vec<Check> {
    let initial = state.initial();
    if initial.is_empty() {
        return vec![Validation::fail(ModelViolation::MissingInitial {
            state: state.name(),
        })];
    }

    let mut checks = Vec::new();
    for (index, child) in initial.iter().enumerate() {
        checks.push(check(child.parent() == Some(state), || {
            ModelViolation::InitialNotChild {
                parent: state.name(),
                child: child.name(),
            }
        }));
        let duplicate = initial[..index].iter().any(|c| c.slot() == child.slot());
        checks.push(check(!duplicate, || ModelViolation::DuplicateRegion {
            parent: state.name(),
            slot: child.slot(),
        }));
    }
    for child in state.children() {
        let covered = initial.iter().any(|c| c.slot() == child.slot());
        checks.push(check(covered, || ModelViolation::UncoveredRegion {
            parent: state.name(),
            child: child.name(),
        }));
    }
    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
    use crate::state_enum;

    state_enum! {
        enum Gate {
            Closed,
            Open,
            OpenLeft,
            OpenRight,
            Done,
        }
        composite: { Open => OpenRight }
        initial: { Open => [OpenLeft, OpenRight] }
        slots: { 1 => [OpenRight] }
        final: [Done]
    }

    #[derive(Clone, Debug)]
    enum GateEvent {
        Push,
    }

    struct GoodGate;

    impl Machine for GoodGate {
        type State = Gate;
        type Event = GateEvent;
        type Output = ();
        const NAME: &'static str = "GoodGate";
        const REGIONS: usize = 2;
        const TIMERS: usize = 0;
        const MAX_ARMED: usize = 0;

        fn define(&self) -> Result<Table<Self>, BuildError> {
            TableBuilder::<Self>::new()
                .initial(Gate::Closed)
                .transition(
                    TransitionBuilder::<Self>::new()
                        .from(Gate::Closed)
                        .on(|e| matches!(e, GateEvent::Push))
                        .to(Gate::Open),
                )?
                .build()
        }
    }

    /// Same states, one region too few, a stray timer and a final state
    /// that still reacts.
    struct BrokenGate;

    impl Machine for BrokenGate {
        type State = Gate;
        type Event = GateEvent;
        type Output = ();
        const NAME: &'static str = "BrokenGate";
        const REGIONS: usize = 1;
        const TIMERS: usize = 0;
        const MAX_ARMED: usize = 0;

        fn define(&self) -> Result<Table<Self>, BuildError> {
            TableBuilder::<Self>::new()
                .initial(Gate::Closed)
                .timer(Gate::Closed, std::time::Duration::from_millis(10), GateEvent::Push)
                .transition(
                    TransitionBuilder::<Self>::new()
                        .from(Gate::Done)
                        .on(|e| matches!(e, GateEvent::Push))
                        .to(Gate::Closed),
                )?
                .build()
        }
    }

    #[test]
    fn well_formed_model_passes() {
        let table = GoodGate.define().unwrap();
        assert!(validate::<GoodGate>(&table).is_success());
    }

    #[test]
    fn validation_accumulates_all_violations() {
        let table = BrokenGate.define().unwrap();

        match validate::<BrokenGate>(&table) {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| matches!(
                    e,
                    ModelViolation::SlotOutOfRange { state: "OpenRight", slot: 1, regions: 1 }
                )));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ModelViolation::TimerCount { declared: 1, expected: 0 })));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ModelViolation::FinalHasTransitions { state: "Done" })));
            }
            Validation::Success(_) => panic!("Expected failures, got success"),
        }
    }

    state_enum! {
        enum Lopsided {
            Idle,
            Busy,
            BusyA,
            BusyB,
            BusyC,
        }
        composite: { Busy => BusyC }
        initial: { Busy => [BusyA, BusyB] }
        slots: { 1 => [BusyC] }
    }

    #[test]
    fn composite_checks_find_region_problems() {
        let checks = composite_checks(Lopsided::Busy);
        let result = Validation::all_vec(checks).map(|_| ());

        assert!(result.is_failure());
        if let Validation::Failure(errors) = result {
            assert!(errors
                .iter()
                .any(|e| matches!(e, ModelViolation::DuplicateRegion { parent: "Busy", slot: 0 })));
            assert!(errors.iter().any(|e| matches!(
                e,
                ModelViolation::UncoveredRegion { parent: "Busy", child: "BusyC" }
            )));
        }
    }

    #[test]
    fn composite_without_initial_is_reported() {
        state_enum! {
            enum Bare {
                Outer,
                Inner,
            }
            composite: { Outer => Inner }
        }

        let checks = composite_checks(Bare::Outer);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].is_failure());
    }
}
