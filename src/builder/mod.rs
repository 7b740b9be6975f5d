//! Builder API for declaring transition tables.
//!
//! This module provides fluent builders and the `state_enum!` macro for
//! describing a machine's hierarchy, transitions, actions and timers with
//! minimal boilerplate.

pub mod error;
pub mod macros;
pub mod table;
pub mod transition;

pub use error::BuildError;
pub use table::TableBuilder;
pub use transition::TransitionBuilder;

use crate::engine::transition::{Target, Transition, Trigger};
use crate::engine::Machine;

/// Create an unguarded transition fired by `trigger`.
///
/// # Example
///
/// ```
/// use railchart::builder::{simple_transition, BuildError, TableBuilder};
/// use railchart::engine::{Machine, Table};
/// use railchart::state_enum;
///
/// state_enum! {
///     enum Light { Off, On }
/// }
///
/// #[derive(Clone, Debug)]
/// enum Press { Button }
///
/// struct Switch;
///
/// impl Machine for Switch {
///     type State = Light;
///     type Event = Press;
///     type Output = ();
///     const NAME: &'static str = "Switch";
///     const REGIONS: usize = 1;
///     const TIMERS: usize = 0;
///     const MAX_ARMED: usize = 0;
///
///     fn define(&self) -> Result<Table<Self>, BuildError> {
///         TableBuilder::<Self>::new()
///             .initial(Light::Off)
///             .add_transition(simple_transition::<Self>(Light::Off, |_| true, Light::On))
///             .build()
///     }
/// }
///
/// assert!(Switch.define().is_ok());
/// ```
pub fn simple_transition<M: Machine>(
    from: M::State,
    trigger: Trigger<M::Event>,
    to: M::State,
) -> Transition<M> {
    Transition {
        source: from,
        trigger: Some(trigger),
        guard: None,
        target: Target::State(to),
        effect: None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{Door, DoorState};
    use super::*;
    use crate::engine::Runtime;
    use crate::settings::EngineSettings;

    #[test]
    fn simple_transition_builds() {
        let transition = simple_transition::<Door>(DoorState::Closed, |_| true, DoorState::Open);

        assert_eq!(transition.source, DoorState::Closed);
        assert!(matches!(transition.target, Target::State(DoorState::Open)));
        assert!(transition.guard.is_none());
    }

    #[test]
    fn door_table_guards_only_the_closing_transition() {
        let table = Door::default().define().unwrap();
        let runtime = Runtime::new(table, &EngineSettings::default());
        let table = runtime.table();

        let closed: Vec<_> = table.transitions_from(DoorState::Closed).collect();
        assert_eq!(closed.len(), 1);
        assert!(closed[0].guard.is_none());

        let open: Vec<_> = table.transitions_from(DoorState::Open).collect();
        assert_eq!(open.len(), 1);
        let guard = open[0].guard.as_ref().unwrap();
        assert!(!guard.check(&Door { pushes: 0 }, &runtime));
        assert!(guard.check(&Door { pushes: 1 }, &runtime));
    }
}
