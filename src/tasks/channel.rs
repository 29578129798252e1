//! Event Channel
//!
//! Unbounded FIFO mailbox carrying task events from a worker thread to the host.

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::types::TaskEvent;

/// Mutex-guarded event queue. Every operation holds the lock for a single
/// push/pop (or one swap for `drain`), so the producer is never blocked by a
/// slow consumer.
#[derive(Debug, Default)]
pub struct EventChannel {
    queue: Mutex<VecDeque<TaskEvent>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn enqueue(&self, event: TaskEvent) {
        self.queue.lock().push_back(event);
    }

    /// Pop the oldest event, if any
    pub fn try_dequeue(&self) -> Option<TaskEvent> {
        self.queue.lock().pop_front()
    }

    /// Take the whole backlog in enqueue order
    pub fn drain(&self) -> Vec<TaskEvent> {
        let pending = std::mem::take(&mut *self.queue.lock());
        pending.into()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
