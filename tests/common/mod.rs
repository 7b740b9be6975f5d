//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use proptest::prelude::*;
use railchart::machines::{
    Aspect, ConfigCallback, OperatingModeCallback, RouteCallback, SectionCallback,
    SignalCallback, SignalControllerCallback, SwitchCallback, TrackerCallback,
};
use railchart::timer::{MachineHandle, TimerId, TimerRequest, TimerService, VirtualTimerService};
use railchart::{Machine, Statechart};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Layout hardware answering every callback of every machine.
///
/// Calls are counted by name; `left` is the reported switch position.
#[derive(Default)]
pub struct Hardware {
    pub left: AtomicBool,
    pub calls: Mutex<Vec<&'static str>>,
    pub sections: AtomicUsize,
}

impl Hardware {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn log(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ConfigCallback for Hardware {
    fn configure(&self) {
        self.log("configure");
    }
    fn boot(&self) {
        self.log("boot");
    }
    fn is_booted(&self) -> bool {
        false
    }
    fn fail(&self) {
        self.log("fail");
    }
}

impl OperatingModeCallback for Hardware {
    fn reset_transaction(&self) {
        self.log("reset_transaction");
    }
    fn activate(&self) {
        self.log("activate");
    }
    fn deactivate(&self) {
        self.log("deactivate");
    }
    fn prepare_editing(&self) {
        self.log("prepare_editing");
    }
    fn finish_editing(&self) {
        self.log("finish_editing");
    }
    fn fail(&self) {
        self.log("fail");
    }
    fn blank(&self, _blanked: bool) {
        self.log("blank");
    }
}

impl RouteCallback for Hardware {
    fn valid(&self) -> bool {
        true
    }
    fn turn(&self) {
        self.log("turn");
    }
    fn activate(&self) {
        self.log("activate");
    }
    fn unlock(&self) {
        self.log("unlock");
    }
    fn fail(&self) {
        self.log("fail");
    }
    fn finished(&self) {
        self.log("finished");
    }
}

impl SectionCallback for Hardware {
    fn on(&self) {
        self.log("on");
    }
    fn off(&self) {
        self.log("off");
    }
    fn request(&self) {
        self.log("request");
    }
    fn fail(&self) {
        self.log("fail");
    }
}

impl SignalControllerCallback for Hardware {
    fn has_main(&self) -> bool {
        true
    }
    fn has_distant(&self) -> bool {
        true
    }
    fn has_shunt(&self) -> bool {
        true
    }
    fn turn_main(&self, _aspect: Aspect) {
        self.log("turn_main");
    }
    fn turn_distant(&self, _aspect: Aspect) {
        self.log("turn_distant");
    }
    fn turn_shunt(&self, _aspect: Aspect) {
        self.log("turn_shunt");
    }
    fn fail(&self) {
        self.log("fail");
    }
}

impl SignalCallback for Hardware {
    fn send(&self, _aspect: Aspect) {
        self.log("send");
    }
    fn has_changed(&self, aspect: Aspect) -> bool {
        aspect != Aspect::Stop
    }
    fn fail(&self) {
        self.log("fail");
    }
}

impl SwitchCallback for Hardware {
    fn request(&self) {
        self.log("request");
    }
    fn left(&self) {
        self.log("left");
    }
    fn right(&self) {
        self.log("right");
    }
    fn lock(&self) {
        self.log("lock");
    }
    fn unlock(&self) {
        self.log("unlock");
    }
    fn fail(&self) {
        self.log("fail");
    }
    fn is_turned_left(&self) -> bool {
        self.left.load(Ordering::SeqCst)
    }
}

impl TrackerCallback for Hardware {
    fn is_empty(&self) -> bool {
        self.sections.load(Ordering::SeqCst) == 0
    }
    fn occupy(&self) {
        self.log("occupy");
    }
    fn free(&self) {
        self.log("free");
        let _ = self
            .sections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
    fn clear(&self) {
        self.log("clear");
    }
    fn fail(&self) {
        self.log("fail");
    }
}

/// Timer service that only records requests, so tests can replay expiries
/// at will.
#[derive(Default)]
pub struct RecordingTimers {
    pub requests: Mutex<Vec<TimerRequest>>,
    pub cancelled: Mutex<Vec<(MachineHandle, TimerId)>>,
}

impl TimerService for RecordingTimers {
    fn set_timer(&self, request: TimerRequest) {
        self.requests.lock().unwrap().push(request);
    }

    fn unset_timer(&self, handle: MachineHandle, timer: TimerId) {
        self.cancelled.lock().unwrap().push((handle, timer));
    }
}

/// One step of a random run.
#[derive(Clone, Debug)]
pub enum Op<E> {
    Raise(E),
    Elapse(u64),
}

/// Random runs over `events`, interleaved with clock advances.
pub fn ops<E: Clone + Debug + 'static>(events: Vec<E>) -> impl Strategy<Value = Vec<Op<E>>> {
    prop::collection::vec(
        prop_oneof![
            3 => prop::sample::select(events).prop_map(Op::Raise),
            1 => (1u64..6_000).prop_map(Op::Elapse),
        ],
        0..40,
    )
}

pub fn elapse<M: Machine>(chart: &mut Statechart<M>, timers: &VirtualTimerService, ms: u64) {
    for expiry in timers.advance(Duration::from_millis(ms)) {
        chart.deliver(&expiry).unwrap();
    }
}

pub fn apply<M: Machine>(chart: &mut Statechart<M>, timers: &VirtualTimerService, op: &Op<M::Event>) {
    match op {
        Op::Raise(event) => chart.raise(event.clone()).unwrap(),
        Op::Elapse(ms) => elapse(chart, timers, *ms),
    }
}
