//! A machine bundled with its runtime: the public face of one instance.

use crate::builder::BuildError;
use crate::checkpoint::{Checkpoint, CheckpointError, MachineMetadata, CHECKPOINT_VERSION};
use crate::core::{State, StateHistory, StateVector};
use crate::engine::error::StatechartError;
use crate::engine::machine::Machine;
use crate::engine::output::OutputSink;
use crate::engine::runtime::Runtime;
use crate::engine::sender::EventSender;
use crate::settings::EngineSettings;
use crate::timer::{Expiry, MachineHandle, TimerService};
use crate::validation::validate;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use stillwater::validation::Validation;
use tracing::debug;

/// One running statechart instance.
///
/// Concrete machines add their `raise_*` methods as inherent impls on
/// `Statechart<TheirMachine>`.
pub struct Statechart<M: Machine> {
    machine: M,
    runtime: Runtime<M>,
    created_at: DateTime<Utc>,
}

impl<M: Machine> Statechart<M> {
    pub fn new(machine: M) -> Result<Self, BuildError> {
        Self::with_settings(machine, &EngineSettings::default())
    }

    /// Build and validate the machine's table.
    pub fn with_settings(machine: M, settings: &EngineSettings) -> Result<Self, BuildError> {
        let table = machine.define()?;
        if let Validation::Failure(violations) = validate::<M>(&table) {
            return Err(BuildError::InvalidModel {
                machine: M::NAME,
                violations: violations.iter().cloned().collect(),
            });
        }
        let runtime = Runtime::new(table, settings);
        debug!(machine = M::NAME, handle = %runtime.handle(), "created");
        Ok(Self {
            machine,
            runtime,
            created_at: Utc::now(),
        })
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Mutable access to the machine data, e.g. to bind callbacks.
    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn runtime(&self) -> &Runtime<M> {
        &self.runtime
    }

    pub fn handle(&self) -> MachineHandle {
        self.runtime.handle()
    }

    pub fn set_timer_service(&mut self, service: Arc<dyn TimerService>) {
        self.runtime.set_timer_service(service);
    }

    /// Push every future output to `sink`.
    pub fn subscribe(&mut self, sink: Arc<dyn OutputSink<M::Output>>) {
        self.runtime.subscribe(sink);
    }

    pub fn sender(&self) -> EventSender<M::Event> {
        self.runtime.sender()
    }

    /// True when the timer service and every operation callback are bound.
    pub fn check(&self) -> bool {
        self.runtime.is_ready(&self.machine)
    }

    pub fn enter(&mut self) -> Result<(), StatechartError> {
        self.runtime.enter(&mut self.machine)
    }

    pub fn exit(&mut self) {
        self.runtime.exit(&mut self.machine)
    }

    pub fn run_cycle(&mut self) -> Result<(), StatechartError> {
        self.runtime.run_cycle(&mut self.machine)
    }

    /// Queue `event` and run a cycle.
    pub fn raise(&mut self, event: M::Event) -> Result<(), StatechartError> {
        self.runtime.enqueue(event);
        self.runtime.run_cycle(&mut self.machine)
    }

    /// Hand a timer expiry from the timer service to this instance.
    pub fn deliver(&mut self, expiry: &Expiry) -> Result<(), StatechartError> {
        self.runtime.deliver(&mut self.machine, expiry)
    }

    /// Outputs emitted during the last cycle.
    pub fn outputs(&self) -> &[M::Output] {
        self.runtime.outputs()
    }

    pub fn is_raised(&self, output: &M::Output) -> bool {
        self.runtime.outputs().contains(output)
    }

    pub fn is_active(&self) -> bool {
        self.runtime.vector().is_active()
    }

    pub fn is_final(&self) -> bool {
        self.runtime.vector().is_final()
    }

    pub fn is_state_active(&self, state: M::State) -> bool {
        self.runtime.is_state_active(state)
    }

    /// Every active state, composites included, in declaration order.
    pub fn active_states(&self) -> Vec<M::State> {
        M::State::all()
            .iter()
            .copied()
            .filter(|state| self.runtime.is_state_active(*state))
            .collect()
    }

    pub fn state_vector(&self) -> &StateVector<M::State> {
        self.runtime.vector()
    }

    pub fn history(&self) -> &StateHistory<M::State> {
        self.runtime.history()
    }

    pub fn armed_timers(&self) -> usize {
        self.runtime.armed_timers()
    }

    pub fn checkpoint(&self) -> Checkpoint<M::State> {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            machine: M::NAME.to_string(),
            timestamp: Utc::now(),
            vector: self.runtime.vector().clone(),
            history: self.runtime.history().clone(),
            metadata: MachineMetadata {
                created_at: self.created_at,
                updated_at: Utc::now(),
                cycles: self.runtime.cycle(),
            },
        }
    }

    /// Restore an inactive instance from a checkpoint.
    ///
    /// Entry actions are not run again; timers of the restored states are
    /// armed afresh.
    pub fn resume(&mut self, checkpoint: &Checkpoint<M::State>) -> Result<(), StatechartError> {
        if self.is_active() {
            return Err(StatechartError::AlreadyActive { machine: M::NAME });
        }
        if !self.check() {
            return Err(StatechartError::NotReady { machine: M::NAME });
        }
        checkpoint.validate(M::NAME, M::REGIONS)?;
        if !checkpoint.vector.is_active() {
            return Err(CheckpointError::ValidationFailed(
                "checkpoint of an inactive machine".to_string(),
            )
            .into());
        }
        debug!(machine = M::NAME, checkpoint = %checkpoint.id, "resume");
        self.runtime
            .restore(checkpoint.vector.clone(), checkpoint.history.clone());
        Ok(())
    }
}
