//! Task Bridge
//!
//! Runs one long operation on a dedicated worker thread and surfaces its events
//! to a single-threaded, frame-driven host.
//!
//! Lifecycle: `Idle -> Running -> {Completing, Cancelling} -> Idle`. The host
//! calls [`TaskBridge::tick`] once per frame; cancellation is cooperative, and
//! [`TaskBridge::finish`] joins the worker with a blocking wait. A worker that
//! never checks [`TaskState::is_cancelled`] will stall the host at that join.

use log::{debug, error, info, trace, warn};
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::display::TaskDisplay;
use super::error::{TaskError, TaskResult};
use super::progress::ProgressAdapter;
use super::state::TaskState;
use super::types::{BridgeStatus, Severity, TaskEvent, TaskOutcome, TaskRecord};
use crate::config::TaskConfig;

/// Completion callback, invoked on the host thread
type Completion<T> = Box<dyn FnOnce(T)>;

/// The task currently owned by a bridge
struct ActiveTask<T> {
    record: TaskRecord,
    state: Arc<TaskState<T>>,
    /// Returns the value produced by a monitored worker, `None` for plain workers
    worker: Option<JoinHandle<Option<T>>>,
    on_completed: Option<Completion<T>>,
}

/// Bridge between one background worker and the host's frame loop
pub struct TaskBridge<T: Default + Send + 'static> {
    display: Box<dyn TaskDisplay>,
    config: TaskConfig,
    status: BridgeStatus,
    active: Option<ActiveTask<T>>,
    last_run: Option<TaskRecord>,
}

impl<T> TaskBridge<T>
where
    T: Default + Send + 'static,
{
    /// Create a bridge that renders progress on `display`
    pub fn new(display: impl TaskDisplay + 'static) -> Self {
        Self {
            display: Box::new(display),
            config: TaskConfig::default(),
            status: BridgeStatus::Idle,
            active: None,
            last_run: None,
        }
    }

    /// Apply task settings (progress time base and backlog limit)
    pub fn with_config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn status(&self) -> BridgeStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == BridgeStatus::Idle
    }

    /// Name of the running task, if any
    pub fn current_task(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.record.name.as_str())
    }

    /// Record of the most recently finished run
    pub fn last_run(&self) -> Option<&TaskRecord> {
        self.last_run.as_ref()
    }

    /// Start `work` on a worker thread.
    ///
    /// The worker publishes its result through [`TaskState::set_result`]. Returns
    /// `Ok(false)` without doing anything if a task is already in flight.
    pub fn start<W, C>(&mut self, name: impl Into<String>, work: W, on_completed: C) -> TaskResult<bool>
    where
        W: FnOnce(&TaskState<T>) + Send + 'static,
        C: FnOnce(T) + 'static,
    {
        self.launch(name.into(), Box::new(on_completed), move |state| {
            work(&state);
            None
        })
    }

    /// Start `work` with a progress adapter to hand to native calls.
    ///
    /// The adapter marks the task complete when the native side reports
    /// `Finished`; the value returned by `work` is delivered to `on_completed`.
    pub fn start_monitored<W, C>(
        &mut self,
        name: impl Into<String>,
        work: W,
        on_completed: C,
    ) -> TaskResult<bool>
    where
        W: FnOnce(&TaskState<T>, &mut ProgressAdapter<T>) -> T + Send + 'static,
        C: FnOnce(T) + 'static,
    {
        let name = name.into();
        let description = name.clone();
        let time_base = Duration::from_millis(self.config.progress_time_base_ms);
        let backlog_limit = self.config.progress_backlog_limit;

        self.launch(name, Box::new(on_completed), move |state| {
            let mut adapter = ProgressAdapter::new(state.clone(), description)
                .with_time_base(time_base)
                .with_backlog_limit(backlog_limit);
            Some(work(&state, &mut adapter))
        })
    }

    fn launch<F>(&mut self, name: String, on_completed: Completion<T>, body: F) -> TaskResult<bool>
    where
        F: FnOnce(Arc<TaskState<T>>) -> Option<T> + Send + 'static,
    {
        if self.status != BridgeStatus::Idle {
            debug!(
                "Ignoring start of '{}': task '{}' is {}",
                name,
                self.current_task().unwrap_or_default(),
                self.status
            );
            return Ok(false);
        }

        let state = Arc::new(TaskState::new());
        let worker_state = state.clone();
        let worker = thread::Builder::new()
            .name(format!("simbridge-task:{}", name))
            .spawn(move || {
                let returned = body(worker_state.clone());
                worker_state.mark_complete();
                returned
            })?;

        self.display.start(&name);
        let record = TaskRecord::new(name);
        info!("Started task: {} ({})", record.name, record.id);

        self.active = Some(ActiveTask {
            record,
            state,
            worker: Some(worker),
            on_completed: Some(on_completed),
        });
        self.status = BridgeStatus::Running;
        Ok(true)
    }

    /// Per-frame poll: drain events, then finish if the worker completed or
    /// cancellation was requested.
    pub fn tick(&mut self) -> BridgeStatus {
        let (name, state, worker_exited) = match &self.active {
            Some(active) => (
                active.record.name.clone(),
                active.state.clone(),
                active.worker.as_ref().map_or(true, |w| w.is_finished()),
            ),
            None => return self.status,
        };

        self.dispatch_pending(&name, &state);

        if state.is_cancelled() {
            self.status = BridgeStatus::Cancelling;
            self.finish();
        } else if state.is_complete() || worker_exited {
            self.status = BridgeStatus::Completing;
            self.finish();
        }

        self.status
    }

    /// Ask the worker to stop. Advisory only; safe to call repeatedly.
    pub fn cancel(&mut self) {
        let Some(active) = &self.active else {
            debug!("Cancel requested with no task running");
            return;
        };

        if active.state.request_cancel() {
            info!("Cancel requested for task: {} ({})", active.record.name, active.record.id);
            self.status = BridgeStatus::Cancelling;
        }
    }

    /// Join the worker, flush remaining events, clear the display and fire the
    /// completion callback. Blocks until the worker returns.
    pub fn finish(&mut self) {
        let Some(mut active) = self.active.take() else {
            self.status = BridgeStatus::Idle;
            return;
        };

        let joined = match active.worker.take() {
            Some(worker) => worker.join(),
            None => Ok(None),
        };

        // Events enqueued between the last tick and worker exit.
        self.dispatch_pending(&active.record.name, &active.state);
        self.display.clear();

        let (outcome, returned) = match joined {
            Ok(returned) if active.state.is_cancelled() => (TaskOutcome::Cancelled, returned),
            Ok(returned) => (TaskOutcome::Completed, returned),
            Err(payload) => {
                error!(
                    "Worker for task '{}' panicked: {}",
                    active.record.name,
                    panic_message(payload.as_ref())
                );
                (TaskOutcome::Panicked, None)
            }
        };
        let result = returned.unwrap_or_else(|| active.state.take_result());

        active.record.finish(outcome);
        info!(
            "Finished task: {} ({:?}, {}ms)",
            active.record.name,
            outcome,
            active.record.duration_ms().unwrap_or_default()
        );

        self.last_run = Some(active.record);
        self.status = BridgeStatus::Idle;

        if let Some(on_completed) = active.on_completed.take() {
            on_completed(result);
        }
    }

    /// Refuse host teardown while a worker is in flight
    pub fn guard_teardown(&self) -> TaskResult<()> {
        match &self.active {
            Some(active) => {
                warn!(
                    "Refusing teardown while task '{}' is {}",
                    active.record.name, self.status
                );
                Err(TaskError::Busy(active.record.name.clone()))
            }
            None => Ok(()),
        }
    }

    fn dispatch_pending(&mut self, task: &str, state: &TaskState<T>) {
        for event in state.events().drain() {
            trace!("{} from task '{}'", event.event_name(), task);
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Progress { message, percent_done } => {
                self.display.report_progress(percent_done, &message);
            }
            TaskEvent::Info { message } => info!("{}", message),
            TaskEvent::Error { message } => {
                self.display.clear();
                error!("{}", message);
            }
            TaskEvent::UserMessage { message, severity } => match severity {
                Severity::Info => info!("{}", message),
                Severity::Warning => warn!("{}", message),
                Severity::Error => error!("{}", message),
            },
        }
    }
}

impl<T: Default + Send + 'static> Drop for TaskBridge<T> {
    fn drop(&mut self) {
        let Some(active) = &self.active else {
            return;
        };

        if active.state.request_cancel() {
            info!("Cancelling task '{}' on teardown", active.record.name);
        }
        self.status = BridgeStatus::Cancelling;
        self.finish();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
