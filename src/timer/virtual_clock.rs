//! Deterministic, manually advanced timer service.

use super::{Expiry, MachineHandle, TimerId, TimerRequest, TimerService};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

#[derive(Debug)]
struct Armed {
    due: Duration,
    period: Option<Duration>,
    generation: u64,
    sequence: u64,
}

#[derive(Debug, Default)]
struct Clock {
    now: Duration,
    sequence: u64,
    armed: HashMap<(MachineHandle, TimerId), Armed>,
}

/// Timer service driven by an explicit virtual clock.
///
/// Nothing fires on its own: [`advance`](Self::advance) moves the clock and
/// returns the expiries in firing order (ties broken by arming order). Hosts
/// route each [`Expiry`] to the machine with the matching handle.
///
/// # Example
///
/// ```rust
/// use railchart::timer::{MachineHandle, TimerId, TimerRequest, TimerService, VirtualTimerService};
/// use std::time::Duration;
///
/// let timers = VirtualTimerService::new();
/// let handle = MachineHandle::new();
/// timers.set_timer(TimerRequest {
///     handle,
///     timer: TimerId(0),
///     delay: Duration::from_millis(50),
///     periodic: false,
///     generation: 1,
/// });
///
/// assert!(timers.advance(Duration::from_millis(49)).is_empty());
/// assert_eq!(timers.advance(Duration::from_millis(1)).len(), 1);
/// assert_eq!(timers.armed_count(handle), 0);
/// ```
#[derive(Debug, Default)]
pub struct VirtualTimerService {
    clock: Mutex<Clock>,
}

impl VirtualTimerService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time elapsed since the service was created.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Move the clock forward and collect every timer that fired.
    ///
    /// Periodic timers fire once per elapsed period.
    pub fn advance(&self, by: Duration) -> Vec<Expiry> {
        let mut clock = self.lock();
        let target = clock.now + by;
        let mut fired = Vec::new();

        loop {
            let next = clock
                .armed
                .iter()
                .filter(|(_, armed)| armed.due <= target)
                .min_by_key(|(_, armed)| (armed.due, armed.sequence))
                .map(|(key, _)| *key);
            let Some(key) = next else {
                break;
            };

            let Some(armed) = clock.armed.get_mut(&key) else {
                break;
            };
            let due = armed.due;
            let generation = armed.generation;
            let reschedule = armed.period;
            if let Some(period) = reschedule {
                armed.due = due + period.max(Duration::from_millis(1));
            }
            if reschedule.is_none() {
                clock.armed.remove(&key);
            }

            clock.now = due;
            trace!(handle = %key.0, timer = key.1 .0, "virtual timer fired");
            fired.push(Expiry {
                handle: key.0,
                timer: key.1,
                generation,
            });
        }

        clock.now = target;
        fired
    }

    /// Number of timers currently armed for `handle`.
    pub fn armed_count(&self, handle: MachineHandle) -> usize {
        self.lock()
            .armed
            .keys()
            .filter(|(owner, _)| *owner == handle)
            .count()
    }

    pub fn is_armed(&self, handle: MachineHandle, timer: TimerId) -> bool {
        self.lock().armed.contains_key(&(handle, timer))
    }

    /// Number of timers armed across all machines.
    pub fn total_armed(&self) -> usize {
        self.lock().armed.len()
    }
}

impl TimerService for VirtualTimerService {
    fn set_timer(&self, request: TimerRequest) {
        let mut clock = self.lock();
        clock.sequence += 1;
        let armed = Armed {
            due: clock.now + request.delay,
            period: request.periodic.then_some(request.delay),
            generation: request.generation,
            sequence: clock.sequence,
        };
        trace!(
            handle = %request.handle,
            timer = request.timer.0,
            delay_ms = request.delay.as_millis() as u64,
            periodic = request.periodic,
            "virtual timer armed"
        );
        clock.armed.insert((request.handle, request.timer), armed);
    }

    fn unset_timer(&self, handle: MachineHandle, timer: TimerId) {
        if self.lock().armed.remove(&(handle, timer)).is_some() {
            trace!(handle = %handle, timer = timer.0, "virtual timer disarmed");
        }
    }
}
