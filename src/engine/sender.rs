//! Thread-safe handle for queueing events into a machine.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Cloneable producer side of a machine's event inbox.
///
/// Events sent here are queued only; they are processed by the next
/// `run_cycle`, or by the running one if a cycle is in progress.
pub struct EventSender<E> {
    inbox: Arc<Mutex<VecDeque<E>>>,
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            inbox: Arc::clone(&self.inbox),
        }
    }
}

impl<E> EventSender<E> {
    pub(crate) fn new(inbox: Arc<Mutex<VecDeque<E>>>) -> Self {
        Self { inbox }
    }

    pub fn send(&self, event: E) {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_inbox() {
        let inbox = Arc::new(Mutex::new(VecDeque::new()));
        let sender = EventSender::new(Arc::clone(&inbox));
        let other = sender.clone();

        sender.send(1);
        other.send(2);

        assert_eq!(sender.pending(), 2);
        assert_eq!(inbox.lock().unwrap().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
