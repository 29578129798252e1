//! Task State
//!
//! State shared between a worker thread and the host polling loop.

use log::warn;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::channel::EventChannel;
use super::types::{Severity, TaskEvent};

/// Shared state for one task run.
///
/// `cancel` is written only by the host and read by the worker; `complete` is
/// written only by the worker (directly or through a progress adapter) and read
/// by the host. Both flags only ever go from false to true.
#[derive(Debug)]
pub struct TaskState<T> {
    cancel: AtomicBool,
    complete: AtomicBool,
    result: Mutex<T>,
    events: EventChannel,
}

impl<T: Default> TaskState<T> {
    pub fn new() -> Self {
        Self {
            cancel: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            result: Mutex::new(T::default()),
            events: EventChannel::new(),
        }
    }
}

impl<T: Default> Default for TaskState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskState<T> {
    /// Whether the host asked the worker to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Set the cancel flag. Returns true only for the call that flipped it.
    pub(crate) fn request_cancel(&self) -> bool {
        !self.cancel.swap(true, Ordering::AcqRel)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Mark the task complete. Idempotent.
    pub fn mark_complete(&self) {
        self.complete.store(true, Ordering::Release);
    }

    /// Write the task result. Refused once the task is complete.
    pub fn set_result(&self, value: T) -> bool {
        let mut slot = self.result.lock();
        // Checked under the lock so the host never reads a value written after completion.
        if self.is_complete() {
            warn!("Ignoring result written after task completion");
            return false;
        }
        *slot = value;
        true
    }

    /// Event channel for this run
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn report_progress(&self, message: impl Into<String>, percent_done: f32) {
        self.events.enqueue(TaskEvent::progress(message, percent_done));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.events.enqueue(TaskEvent::info(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.events.enqueue(TaskEvent::error(message));
    }

    pub fn user_message(&self, message: impl Into<String>, severity: Severity) {
        self.events.enqueue(TaskEvent::user_message(message, severity));
    }
}

impl<T: Default> TaskState<T> {
    /// Move the result out, leaving the default behind
    pub(crate) fn take_result(&self) -> T {
        std::mem::take(&mut *self.result.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_frozen_after_complete() {
        let state: TaskState<i32> = TaskState::new();
        assert!(state.set_result(7));
        state.mark_complete();

        assert!(!state.set_result(99));
        assert_eq!(state.take_result(), 7);
    }

    #[test]
    fn test_cancel_flips_once() {
        let state: TaskState<()> = TaskState::new();
        assert!(!state.is_cancelled());
        assert!(state.request_cancel());
        assert!(!state.request_cancel());
        assert!(state.is_cancelled());
    }
}
