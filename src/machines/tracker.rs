//! Simulated train run along a route.
//!
//! The tracker walks the sections of a route one step at a time: it occupies
//! the next section, waits one step and frees the section behind. Freeing
//! raises an internal `Completed`, which is handled before any queued
//! external event.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::engine::{Machine, Statechart, StatechartError, Table};
use crate::settings::{millis, TrackerSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum TrackerState {
        Idle,
        Tracking,
        Occupying,
        Freeing,
        Failed,
    }
    composite: { Tracking => Freeing }
    initial: { Tracking => [Occupying] }
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerEvent {
    Start,
    Step,
    Completed,
    Clear,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerOutput {
    Finished,
    Failed,
}

pub trait TrackerCallback: Send + Sync {
    /// True once no section is left to track.
    fn is_empty(&self) -> bool;
    fn occupy(&self);
    fn free(&self);
    fn clear(&self);
    fn fail(&self);
}

pub struct Tracker {
    callback: Option<Arc<dyn TrackerCallback>>,
    settings: TrackerSettings,
}

impl Tracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            callback: None,
            settings,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn TrackerCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn TrackerCallback>) {
        self.callback = Some(callback);
    }

    fn call(&self, f: impl FnOnce(&dyn TrackerCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn is_empty(&self) -> bool {
        self.callback.as_ref().map_or(true, |cb| cb.is_empty())
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}

type Edge = TransitionBuilder<Tracker>;

/// Branch taken after `start` or a freed section: back to `Idle` when the
/// route is done, on to the next section otherwise. Listed in guard order.
fn next_section(source: TrackerState, trigger: fn(&TrackerEvent) -> bool) -> [Edge; 2] {
    [
        Edge::new()
            .from(source)
            .on(trigger)
            .when(|tracker, _| tracker.is_empty())
            .to(TrackerState::Idle)
            .effect(|_, rt| rt.emit(TrackerOutput::Finished)),
        Edge::new()
            .from(source)
            .on(trigger)
            .to(TrackerState::Occupying),
    ]
}

impl Machine for Tracker {
    type State = TrackerState;
    type Event = TrackerEvent;
    type Output = TrackerOutput;

    const NAME: &'static str = "Tracker";
    const REGIONS: usize = 1;
    const TIMERS: usize = 1;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use TrackerState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(Idle)
            .on_entry(Occupying, |tracker, _| tracker.call(|cb| cb.occupy()))
            .on_entry(Freeing, |tracker, rt| {
                tracker.call(|cb| cb.free());
                rt.raise_internal(TrackerEvent::Completed);
            })
            .on_entry(Failed, |tracker, rt| {
                tracker.call(|cb| cb.fail());
                rt.emit(TrackerOutput::Failed);
            })
            .timer(Occupying, millis(self.settings.step_ms), TrackerEvent::Step)
            .transition(
                Edge::new()
                    .from(Occupying)
                    .on(|e| matches!(e, TrackerEvent::Step))
                    .to(Freeing),
            )?
            .transition(
                Edge::new()
                    .from(Tracking)
                    .on(|e| matches!(e, TrackerEvent::Clear))
                    .to(Idle)
                    .effect(|tracker, _| tracker.call(|cb| cb.clear())),
            )?
            .transition(
                Edge::new()
                    .from(Failed)
                    .on(|e| matches!(e, TrackerEvent::Clear))
                    .to(Idle),
            )?;

        let branches = next_section(Idle, |e| matches!(e, TrackerEvent::Start))
            .into_iter()
            .chain(next_section(Freeing, |e| matches!(e, TrackerEvent::Completed)));
        for branch in branches {
            table = table.transition(branch)?;
        }
        for source in [Idle, Tracking] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, TrackerEvent::Failed))
                    .to(Failed),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<Tracker> {
    pub fn raise_start(&mut self) -> Result<(), StatechartError> {
        self.raise(TrackerEvent::Start)
    }

    pub fn raise_clear(&mut self) -> Result<(), StatechartError> {
        self.raise(TrackerEvent::Clear)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(TrackerEvent::Failed)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::TrackerCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A route of `remaining` sections; every `free` consumes one.
    #[derive(Default)]
    pub struct MockTracker {
        pub remaining: AtomicUsize,
        pub occupies: AtomicUsize,
        pub frees: AtomicUsize,
        pub clears: AtomicUsize,
        pub fails: AtomicUsize,
    }

    impl MockTracker {
        pub fn with_sections(sections: usize) -> Self {
            let mock = Self::default();
            mock.remaining.store(sections, Ordering::SeqCst);
            mock
        }
    }

    impl TrackerCallback for MockTracker {
        fn is_empty(&self) -> bool {
            self.remaining.load(Ordering::SeqCst) == 0
        }
        fn occupy(&self) {
            self.occupies.fetch_add(1, Ordering::SeqCst);
        }
        fn free(&self) {
            self.frees.fetch_add(1, Ordering::SeqCst);
            let _ = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        }
        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
        fn fail(&self) {
            self.fails.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTracker;
    use super::*;
    use crate::machines::testing::elapse;
    use crate::timer::VirtualTimerService;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn fixture(
        sections: usize,
    ) -> (Statechart<Tracker>, Arc<MockTracker>, Arc<VirtualTimerService>) {
        let mock = Arc::new(MockTracker::with_sections(sections));
        let timers = Arc::new(VirtualTimerService::new());
        let mut chart = Statechart::new(Tracker::default().with_callback(mock.clone())).unwrap();
        chart.set_timer_service(timers.clone());
        (chart, mock, timers)
    }

    fn step(chart: &mut Statechart<Tracker>, timers: &VirtualTimerService) {
        elapse(chart, timers, Duration::from_millis(1000));
    }

    #[test]
    fn empty_route_finishes_immediately() {
        let (mut chart, mock, _timers) = fixture(0);
        chart.enter().unwrap();
        chart.raise_start().unwrap();

        assert!(chart.is_state_active(TrackerState::Idle));
        assert!(chart.is_raised(&TrackerOutput::Finished));
        assert_eq!(mock.occupies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn walks_every_section() {
        let (mut chart, mock, timers) = fixture(3);
        chart.enter().unwrap();
        chart.raise_start().unwrap();
        assert!(chart.is_state_active(TrackerState::Occupying));

        step(&mut chart, &timers);
        step(&mut chart, &timers);
        assert!(chart.is_state_active(TrackerState::Occupying));
        assert!(!chart.is_raised(&TrackerOutput::Finished));

        step(&mut chart, &timers);
        assert!(chart.is_state_active(TrackerState::Idle));
        assert!(chart.is_raised(&TrackerOutput::Finished));
        assert_eq!(mock.occupies.load(Ordering::SeqCst), 3);
        assert_eq!(mock.frees.load(Ordering::SeqCst), 3);
        assert_eq!(timers.armed_count(chart.handle()), 0);
    }

    #[test]
    fn internal_completion_runs_before_queued_events() {
        let (mut chart, mock, timers) = fixture(2);
        chart.enter().unwrap();
        chart.raise_start().unwrap();

        chart.sender().send(TrackerEvent::Clear);
        step(&mut chart, &timers);

        assert_eq!(mock.frees.load(Ordering::SeqCst), 1);
        assert_eq!(mock.occupies.load(Ordering::SeqCst), 2);
        assert_eq!(mock.clears.load(Ordering::SeqCst), 1);
        assert!(chart.is_state_active(TrackerState::Idle));
        assert_eq!(timers.armed_count(chart.handle()), 0);
    }

    #[test]
    fn failure_is_cleared_back_to_idle() {
        let (mut chart, mock, _timers) = fixture(2);
        chart.enter().unwrap();
        chart.raise_start().unwrap();
        chart.raise_failed().unwrap();

        assert!(chart.is_state_active(TrackerState::Failed));
        assert!(chart.is_raised(&TrackerOutput::Failed));
        assert_eq!(mock.fails.load(Ordering::SeqCst), 1);
        assert_eq!(chart.armed_timers(), 0);

        chart.raise_clear().unwrap();
        assert!(chart.is_state_active(TrackerState::Idle));
        assert_eq!(mock.clears.load(Ordering::SeqCst), 0);
    }
}
