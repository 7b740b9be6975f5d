//! The generic statechart engine.
//!
//! A concrete machine implements [`Machine`] and describes itself with a
//! [`Table`]; [`Statechart`] pairs the machine data with a [`Runtime`] that
//! interprets that table with run-to-completion semantics.

pub mod error;
pub mod machine;
pub mod output;
pub mod runtime;
pub mod sender;
pub mod statechart;
pub mod table;
pub mod transition;

pub use error::StatechartError;
pub use machine::Machine;
pub use output::{FnSink, OutputLog, OutputSink};
pub use runtime::Runtime;
pub use sender::EventSender;
pub use statechart::Statechart;
pub use table::{Table, TimerSpec};
pub use transition::{Action, ChoiceFn, Guard, Target, Transition, Trigger};
