//! Timer service boundary.
//!
//! Machines never own timers. When a state with a declared timer is entered
//! the engine asks the shared [`TimerService`] to arm `(handle, timer)`; when
//! the state is exited it asks to disarm it. The host later delivers each
//! [`Expiry`] back to the owning machine, which turns it into an ordinary
//! queued event.
//!
//! Every arm carries a generation number. An expiry whose generation is no
//! longer the armed one (the state was exited, or re-entered and re-armed)
//! resolves to a no-op inside the machine.

mod virtual_clock;

pub use virtual_clock::VirtualTimerService;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Opaque identity of one machine instance towards the timer service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineHandle(Uuid);

impl MachineHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for MachineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MachineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Machine-local timer index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub usize);

/// Request to arm one timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerRequest {
    pub handle: MachineHandle,
    pub timer: TimerId,
    pub delay: Duration,
    pub periodic: bool,
    pub generation: u64,
}

/// A fired timer, to be delivered to the machine identified by `handle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expiry {
    pub handle: MachineHandle,
    pub timer: TimerId,
    pub generation: u64,
}

/// Host scheduler interface.
///
/// Implementations are shared between many machines and must be thread-safe.
/// Arming an already armed `(handle, timer)` replaces it; disarming an unarmed
/// timer does nothing.
pub trait TimerService: Send + Sync {
    fn set_timer(&self, request: TimerRequest);

    fn unset_timer(&self, handle: MachineHandle, timer: TimerId);
}
