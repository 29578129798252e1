//! Progress Adapter
//!
//! Bridges the native Start/Continue/Finished progress protocol to task events.

use log::trace;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::state::TaskState;
use super::types::TaskEvent;

/// Progress state reported by a long native call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressState {
    Start,
    Continue { elapsed_ms: u64 },
    Finished,
}

/// Reply to the native layer; `Cancel` may be honored to abort early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressReply {
    Continue,
    Cancel,
}

/// Native-side progress callback
pub trait ProgressMonitor {
    fn report(&mut self, state: ProgressState) -> ProgressReply;
}

/// Monitor that ignores every report
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentMonitor;

impl ProgressMonitor for SilentMonitor {
    fn report(&mut self, _state: ProgressState) -> ProgressReply {
        ProgressReply::Continue
    }
}

/// Turns native progress reports into `Progress` events on a task's channel.
///
/// The percentage is an estimate: elapsed time over a fixed time base, clamped
/// to 1. It is neither monotonic across native calls nor tied to actual work done.
pub struct ProgressAdapter<T> {
    state: Arc<TaskState<T>>,
    description: String,
    time_base: Duration,
    backlog_limit: usize,
}

impl<T> ProgressAdapter<T> {
    pub fn new(state: Arc<TaskState<T>>, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
            time_base: Duration::from_millis(1000),
            backlog_limit: 256,
        }
    }

    /// Set the time base that maps to 100%
    pub fn with_time_base(mut self, time_base: Duration) -> Self {
        self.time_base = time_base;
        self
    }

    /// Skip `Continue` updates while this many events are still undrained
    pub fn with_backlog_limit(mut self, limit: usize) -> Self {
        self.backlog_limit = limit;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Estimated fraction done for an elapsed time
    pub fn fraction(&self, elapsed_ms: u64) -> f32 {
        let base = self.time_base.as_millis();
        if base == 0 {
            return 1.0;
        }
        (elapsed_ms as f64 / base as f64).clamp(0.0, 1.0) as f32
    }
}

impl<T> ProgressMonitor for ProgressAdapter<T> {
    fn report(&mut self, state: ProgressState) -> ProgressReply {
        match state {
            ProgressState::Start => {
                self.state
                    .events()
                    .enqueue(TaskEvent::progress(self.description.clone(), 0.0));
            }
            ProgressState::Continue { elapsed_ms } => {
                if self.state.events().len() >= self.backlog_limit {
                    trace!("Progress backlog full, skipping update for {}", self.description);
                } else {
                    let fraction = self.fraction(elapsed_ms);
                    self.state
                        .events()
                        .enqueue(TaskEvent::progress(self.description.clone(), fraction));
                }
            }
            ProgressState::Finished => {
                // Direct transition; the host must not wait for one more drained event.
                self.state.mark_complete();
            }
        }

        ProgressReply::Continue
    }
}
