//! Output event channels.
//!
//! A machine emits outputs from its actions. Every emitted output is kept for
//! polling until the next cycle starts, and pushed to every subscribed
//! [`OutputSink`].

use std::sync::{Mutex, PoisonError};

/// Push-style observer of a machine's outputs.
pub trait OutputSink<O>: Send + Sync {
    fn on_output(&self, output: &O);
}

/// Adapts a closure into an [`OutputSink`].
pub struct FnSink<F>(pub F);

impl<O, F> OutputSink<O> for FnSink<F>
where
    F: Fn(&O) + Send + Sync,
{
    fn on_output(&self, output: &O) {
        (self.0)(output)
    }
}

/// Collects outputs so they can be polled later, possibly from another
/// thread or across several cycles.
#[derive(Debug)]
pub struct OutputLog<O> {
    received: Mutex<Vec<O>>,
}

impl<O> Default for OutputLog<O> {
    fn default() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
        }
    }
}

impl<O: Clone + PartialEq> OutputLog<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self, output: &O) -> bool {
        self.lock().contains(output)
    }

    /// Number of times `output` was received.
    pub fn count(&self, output: &O) -> usize {
        self.lock().iter().filter(|o| *o == output).count()
    }

    /// Everything received so far, in order.
    pub fn snapshot(&self) -> Vec<O> {
        self.lock().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<O> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<O>> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O: Clone + PartialEq + Send> OutputSink<O> for OutputLog<O> {
    fn on_output(&self, output: &O) {
        self.lock().push(output.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn log_records_in_order() {
        let log = OutputLog::new();
        log.on_output(&1);
        log.on_output(&2);
        log.on_output(&1);

        assert!(log.is_raised(&2));
        assert_eq!(log.count(&1), 2);
        assert_eq!(log.snapshot(), vec![1, 2, 1]);
    }

    #[test]
    fn take_drains_log() {
        let log = OutputLog::new();
        log.on_output(&"started");
        assert_eq!(log.take(), vec!["started"]);
        assert!(!log.is_raised(&"started"));
    }

    #[test]
    fn fn_sink_forwards() {
        let calls = AtomicUsize::new(0);
        let sink = FnSink(|value: &u32| {
            calls.fetch_add(*value as usize, Ordering::SeqCst);
        });
        sink.on_output(&3);
        sink.on_output(&4);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }
}
