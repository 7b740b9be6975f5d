//! Generic run-to-completion interpreter.
//!
//! One `Runtime` drives one machine instance: it owns the state vector, the
//! event queues, the timer bookkeeping and the output buffer, and interprets
//! the machine's [`Table`].
//!
//! A cycle dispatches queued events one at a time. After each dispatch the
//! runtime executes microsteps until the configuration is stable: every
//! active slot is visited in ascending order and may fire at most one
//! transition per microstep. The dispatched event is only visible to the
//! first microstep; later microsteps evaluate eventless (completion)
//! transitions, which is how joins settle.

use crate::core::{State, StateHistory, StateTransition, StateVector};
use crate::engine::error::StatechartError;
use crate::engine::machine::Machine;
use crate::engine::output::OutputSink;
use crate::engine::sender::EventSender;
use crate::engine::table::Table;
use crate::engine::transition::{Target, Transition};
use crate::settings::EngineSettings;
use crate::timer::{Expiry, MachineHandle, TimerId, TimerRequest, TimerService};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, trace, warn};

/// Queued entry of the external queue.
enum Pending<E> {
    Event(E),
    /// Time event, validated against the armed generation on dispatch.
    Timer(TimerId, u64),
}

/// Execution state of one machine instance.
///
/// Actions receive `&mut Runtime` next to the machine data and use it to read
/// the current event, emit outputs and raise further events.
pub struct Runtime<M: Machine> {
    handle: MachineHandle,
    table: Arc<Table<M>>,
    vector: StateVector<M::State>,
    timers: Option<Arc<dyn TimerService>>,
    armed: Vec<Option<u64>>,
    generation: u64,
    current: Option<M::Event>,
    internal: VecDeque<M::Event>,
    queue: VecDeque<Pending<M::Event>>,
    inbox: Arc<Mutex<VecDeque<M::Event>>>,
    outputs: Vec<M::Output>,
    sinks: Vec<Arc<dyn OutputSink<M::Output>>>,
    history: StateHistory<M::State>,
    executing: bool,
    cycle: u64,
    max_microsteps: usize,
}

impl<M: Machine> Runtime<M> {
    pub(crate) fn new(table: Table<M>, settings: &EngineSettings) -> Self {
        let armed = vec![None; table.timers().len()];
        Self {
            handle: MachineHandle::new(),
            table: Arc::new(table),
            vector: StateVector::new(M::REGIONS),
            timers: None,
            armed,
            generation: 0,
            current: None,
            internal: VecDeque::new(),
            queue: VecDeque::new(),
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            outputs: Vec::new(),
            sinks: Vec::new(),
            history: StateHistory::with_capacity(settings.history_capacity),
            executing: false,
            cycle: 0,
            max_microsteps: settings.max_microsteps,
        }
    }

    pub fn handle(&self) -> MachineHandle {
        self.handle
    }

    pub fn table(&self) -> &Table<M> {
        &self.table
    }

    /// The event being dispatched, if any.
    pub fn event(&self) -> Option<&M::Event> {
        self.current.as_ref()
    }

    pub fn vector(&self) -> &StateVector<M::State> {
        &self.vector
    }

    pub fn is_state_active(&self, state: M::State) -> bool {
        self.vector.is_state_active(state)
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn history(&self) -> &StateHistory<M::State> {
        &self.history
    }

    /// Number of cycles started so far, including `enter`.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Outputs emitted since the last cycle started.
    pub fn outputs(&self) -> &[M::Output] {
        &self.outputs
    }

    pub fn sender(&self) -> EventSender<M::Event> {
        EventSender::new(Arc::clone(&self.inbox))
    }

    pub(crate) fn set_timer_service(&mut self, service: Arc<dyn TimerService>) {
        self.timers = Some(service);
    }

    pub(crate) fn subscribe(&mut self, sink: Arc<dyn OutputSink<M::Output>>) {
        self.sinks.push(sink);
    }

    /// Emit an output: keep it for polling and push it to every sink.
    pub fn emit(&mut self, output: M::Output) {
        debug!(machine = M::NAME, output = ?output, "output");
        for sink in &self.sinks {
            sink.on_output(&output);
        }
        self.outputs.push(output);
    }

    /// Queue an event ahead of every external event.
    pub fn raise_internal(&mut self, event: M::Event) {
        self.internal.push_back(event);
    }

    /// Append an event to the external queue without running a cycle.
    pub fn enqueue(&mut self, event: M::Event) {
        self.queue.push_back(Pending::Event(event));
    }

    /// Timer service bound (when the machine declares timers) and
    /// callbacks bound.
    pub fn is_ready(&self, machine: &M) -> bool {
        (self.table.timers().is_empty() || self.timers.is_some()) && machine.check()
    }

    fn ensure_ready(&self, machine: &M) -> Result<(), StatechartError> {
        if self.is_ready(machine) {
            Ok(())
        } else {
            warn!(machine = M::NAME, "rejected call on a machine that is not ready");
            Err(StatechartError::NotReady { machine: M::NAME })
        }
    }

    /// Default entry of the whole machine. No-op while active or executing.
    pub fn enter(&mut self, machine: &mut M) -> Result<(), StatechartError> {
        if self.executing {
            trace!(machine = M::NAME, "enter ignored while executing");
            return Ok(());
        }
        self.ensure_ready(machine)?;
        if self.vector.is_active() {
            return Ok(());
        }

        self.executing = true;
        self.outputs.clear();
        self.cycle += 1;
        debug!(machine = M::NAME, "enter");

        let before = self.vector.clone();
        let table = Arc::clone(&self.table);
        for &state in table.initial() {
            self.enter_region(machine, state, None);
        }
        self.record_changes(&before, None);

        let result = self.stabilize(machine).and_then(|()| self.drain(machine));
        self.executing = false;
        result
    }

    /// Exit every active state bottom-up and reset the vector.
    ///
    /// Always succeeds on an idle runtime; no-op while executing. Pending
    /// events are discarded.
    pub fn exit(&mut self, machine: &mut M) {
        if self.executing {
            trace!(machine = M::NAME, "exit ignored while executing");
            return;
        }
        self.executing = true;
        self.outputs.clear();
        debug!(machine = M::NAME, "exit");

        let before = self.vector.clone();
        let mut roots: Vec<M::State> = Vec::new();
        for leaf in self.vector.leaves() {
            let root = leaf.ancestors().last().copied().unwrap_or(leaf);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        for root in roots {
            self.exit_state(machine, root);
        }
        self.vector.reset();
        self.record_changes(&before, None);

        self.current = None;
        self.internal.clear();
        self.queue.clear();
        self.lock_inbox().clear();
        self.executing = false;
    }

    /// Process every queued event to completion.
    ///
    /// No-op while executing. Events reaching an inactive machine are
    /// dropped.
    pub fn run_cycle(&mut self, machine: &mut M) -> Result<(), StatechartError> {
        if self.executing {
            trace!(machine = M::NAME, "run_cycle ignored while executing");
            return Ok(());
        }
        self.ensure_ready(machine)?;
        self.collect_inbox();
        if !self.vector.is_active() {
            trace!(
                machine = M::NAME,
                dropped = self.queue.len() + self.internal.len(),
                "machine inactive, dropping events"
            );
            self.queue.clear();
            self.internal.clear();
            return Ok(());
        }

        self.executing = true;
        self.outputs.clear();
        self.cycle += 1;
        let result = self.drain(machine);
        self.executing = false;
        result
    }

    /// Turn a timer expiry into a queued time event and run a cycle.
    ///
    /// Expiries for another handle, or whose generation is no longer armed,
    /// are ignored.
    pub fn deliver(&mut self, machine: &mut M, expiry: &Expiry) -> Result<(), StatechartError> {
        if expiry.handle != self.handle || !self.is_armed(expiry.timer, expiry.generation) {
            trace!(
                machine = M::NAME,
                timer = expiry.timer.0,
                generation = expiry.generation,
                "stale timer expiry ignored"
            );
            return Ok(());
        }
        self.queue
            .push_back(Pending::Timer(expiry.timer, expiry.generation));
        self.run_cycle(machine)
    }

    /// Number of timers currently armed by this instance.
    pub fn armed_timers(&self) -> usize {
        self.armed.iter().filter(|g| g.is_some()).count()
    }

    fn is_armed(&self, timer: TimerId, generation: u64) -> bool {
        self.armed.get(timer.0) == Some(&Some(generation))
    }

    fn lock_inbox(&self) -> std::sync::MutexGuard<'_, VecDeque<M::Event>> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collect_inbox(&mut self) {
        let received: Vec<M::Event> = self.lock_inbox().drain(..).collect();
        self.queue.extend(received.into_iter().map(Pending::Event));
    }

    fn drain(&mut self, machine: &mut M) -> Result<(), StatechartError> {
        loop {
            self.collect_inbox();
            let Some(event) = self.next_event() else {
                return Ok(());
            };
            debug!(machine = M::NAME, event = ?event, "dispatch");
            self.current = Some(event);
            let result = self.stabilize(machine);
            self.current = None;
            result?;
        }
    }

    fn next_event(&mut self) -> Option<M::Event> {
        if let Some(event) = self.internal.pop_front() {
            return Some(event);
        }
        while let Some(pending) = self.queue.pop_front() {
            match pending {
                Pending::Event(event) => return Some(event),
                Pending::Timer(timer, generation) => {
                    if !self.is_armed(timer, generation) {
                        trace!(machine = M::NAME, timer = timer.0, "time event cancelled");
                        continue;
                    }
                    let Some(spec) = self.table.timers().get(timer.0) else {
                        continue;
                    };
                    if !spec.periodic {
                        self.armed[timer.0] = None;
                    }
                    return Some(spec.event.clone());
                }
            }
        }
        None
    }

    fn stabilize(&mut self, machine: &mut M) -> Result<(), StatechartError> {
        let mut steps = 0;
        while self.microstep(machine) {
            self.current = None;
            steps += 1;
            if steps > self.max_microsteps {
                error!(
                    machine = M::NAME,
                    limit = self.max_microsteps,
                    "eventless transitions keep firing"
                );
                return Err(StatechartError::MicrostepLimit {
                    machine: M::NAME,
                    limit: self.max_microsteps,
                });
            }
        }
        Ok(())
    }

    /// Returns true if any slot fired.
    fn microstep(&mut self, machine: &mut M) -> bool {
        let table = Arc::clone(&self.table);
        let mut fired = vec![false; self.vector.len()];
        let mut any = false;

        for slot in 0..self.vector.len() {
            if fired[slot] {
                continue;
            }
            let Some(leaf) = self.vector.get(slot) else {
                continue;
            };
            let Some(transition) = self.select(&table, machine, leaf, slot, &fired) else {
                continue;
            };
            for changed in self.fire(machine, transition, slot) {
                fired[changed] = true;
            }
            fired[slot] = true;
            any = true;
        }
        any
    }

    /// Child-first search for the first enabled transition reacting from
    /// `slot`. A composite reacts only from its highest active slot, and not
    /// at all once one of its regions fired in this microstep.
    fn select<'t>(
        &self,
        table: &'t Table<M>,
        machine: &M,
        leaf: M::State,
        slot: usize,
        fired: &[bool],
    ) -> Option<&'t Transition<M>> {
        let mut state = leaf;
        loop {
            if state != leaf {
                if self.vector.last_slot_of(state) != Some(slot) {
                    return None;
                }
                if region_slots(state).any(|s| fired.get(s).copied().unwrap_or(false)) {
                    return None;
                }
            }
            if let Some(transition) = table
                .transitions_from(state)
                .find(|t| t.can_execute(machine, self))
            {
                return Some(transition);
            }
            state = state.parent()?;
        }
    }

    /// Execute one transition. Returns the slots whose leaf changed.
    ///
    /// A choice is resolved after the source is exited and the effect has
    /// run, so its branches see the effect. Enclosing states the chosen
    /// branch leaves are exited after the effect.
    fn fire(&mut self, machine: &mut M, transition: &Transition<M>, slot: usize) -> Vec<usize> {
        let before = self.vector.clone();
        let source = transition.source;

        let (scope, target) = match &transition.target {
            Target::Internal => {
                debug!(machine = M::NAME, state = source.name(), slot, "internal transition");
                run_effect(machine, self, transition);
                return Vec::new();
            }
            Target::State(target) => {
                let scope = exit_scope(source, *target);
                self.exit_state(machine, scope);
                run_effect(machine, self, transition);
                (scope, *target)
            }
            Target::Choice(choice) => {
                self.exit_state(machine, source);
                run_effect(machine, self, transition);
                (source, choice(machine, self))
            }
        };

        let outer = exit_scope(source, target);
        if outer != scope {
            self.exit_state(machine, outer);
        }
        debug!(
            machine = M::NAME,
            from = source.name(),
            to = target.name(),
            slot,
            "transition"
        );
        self.enter_path(machine, target, outer.parent());

        self.record_changes(&before, Some(slot))
    }

    fn exit_state(&mut self, machine: &mut M, state: M::State) {
        for child in self.vector.active_children(state) {
            self.exit_state(machine, child);
        }
        self.disarm(state);
        let table = Arc::clone(&self.table);
        for action in table.exit_actions(state) {
            action(machine, self);
        }
        if state.is_leaf() {
            self.vector.clear(state.slot());
        }
        trace!(machine = M::NAME, state = state.name(), "exited");
    }

    /// Enter `target` and every state between `anchor` (exclusive, already
    /// active) and it.
    fn enter_path(&mut self, machine: &mut M, target: M::State, anchor: Option<M::State>) {
        let mut path: Vec<M::State> = target
            .ancestors()
            .into_iter()
            .take_while(|ancestor| Some(*ancestor) != anchor)
            .collect();
        path.reverse();
        path.push(target);
        self.enter_chain(machine, &path);
    }

    fn enter_chain(&mut self, machine: &mut M, path: &[M::State]) {
        let Some((&state, rest)) = path.split_first() else {
            return;
        };
        let Some(&next) = rest.first() else {
            self.enter_default(machine, state);
            return;
        };
        self.run_entry(machine, state);
        for &child in state.initial() {
            if child.slot() == next.slot() {
                self.enter_chain(machine, rest);
            } else {
                self.enter_region(machine, child, Some(state));
            }
        }
    }

    fn enter_default(&mut self, machine: &mut M, state: M::State) {
        if state.is_leaf() {
            self.vector.set(state);
            self.run_entry(machine, state);
            return;
        }
        self.run_entry(machine, state);
        for &child in state.initial() {
            self.enter_region(machine, child, Some(state));
        }
    }

    /// Default entry of one region, honouring an initial choice.
    fn enter_region(&mut self, machine: &mut M, default: M::State, parent: Option<M::State>) {
        let table = Arc::clone(&self.table);
        match table.initial_choice(default) {
            Some(choice) => {
                let target = choice(machine, self);
                self.enter_path(machine, target, parent);
            }
            None => self.enter_default(machine, default),
        }
    }

    fn run_entry(&mut self, machine: &mut M, state: M::State) {
        trace!(machine = M::NAME, state = state.name(), "entered");
        let table = Arc::clone(&self.table);
        for action in table.entry_actions(state) {
            action(machine, self);
        }
        self.arm(state);
    }

    fn arm(&mut self, state: M::State) {
        let table = Arc::clone(&self.table);
        for (timer, spec) in table.timers_of(state) {
            self.generation += 1;
            self.armed[timer.0] = Some(self.generation);
            if let Some(service) = &self.timers {
                service.set_timer(TimerRequest {
                    handle: self.handle,
                    timer,
                    delay: spec.delay,
                    periodic: spec.periodic,
                    generation: self.generation,
                });
            }
        }
    }

    fn disarm(&mut self, state: M::State) {
        let table = Arc::clone(&self.table);
        for (timer, _) in table.timers_of(state) {
            self.armed[timer.0] = None;
            if let Some(service) = &self.timers {
                service.unset_timer(self.handle, timer);
            }
        }
    }

    /// Restore a configuration without running entry actions, re-arming the
    /// timers of every active state.
    pub(crate) fn restore(
        &mut self,
        vector: StateVector<M::State>,
        history: StateHistory<M::State>,
    ) {
        self.vector = vector;
        self.history = history;
        let active: Vec<M::State> = M::State::all()
            .iter()
            .copied()
            .filter(|state| self.vector.is_state_active(*state))
            .collect();
        for state in active {
            self.arm(state);
        }
    }

    fn record_changes(&mut self, before: &StateVector<M::State>, reacting: Option<usize>) -> Vec<usize> {
        let mut changed = Vec::new();
        for slot in 0..self.vector.len() {
            let from = before.get(slot);
            let to = self.vector.get(slot);
            if from != to {
                changed.push(slot);
            } else if reacting != Some(slot) {
                continue;
            }
            self.history.record(StateTransition {
                slot,
                from,
                to,
                timestamp: Utc::now(),
                cycle: self.cycle,
            });
        }
        changed
    }
}

fn run_effect<M: Machine>(machine: &mut M, runtime: &mut Runtime<M>, transition: &Transition<M>) {
    if let Some(effect) = &transition.effect {
        effect(machine, runtime);
    }
}

/// The outermost state left when going from `source` to `target`.
///
/// A target containing the source is exited and re-entered itself.
fn exit_scope<S: State>(source: S, target: S) -> S {
    if target.contains(&source) {
        return target;
    }
    let mut scope = source;
    while let Some(parent) = scope.parent() {
        if parent.contains(&target) {
            break;
        }
        scope = parent;
    }
    scope
}

/// Slots spanned by the regions below `state`.
fn region_slots<S: State>(state: S) -> impl Iterator<Item = usize> {
    let leaves = state.leaves();
    let first = leaves.iter().map(State::slot).min().unwrap_or(0);
    let last = leaves.iter().map(State::slot).max().unwrap_or(0);
    first..=last
}
