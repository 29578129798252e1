//! Headless demo session
//!
//! Runs the frame host against a simulated tracker handle while a simulated
//! long operation streams progress through a task bridge.

use anyhow::Context;
use log::{error, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

use crate::config::BridgeConfig;
use crate::host::{run_frames, FrameHost, HostResult};
use crate::module::{ChangeMask, ListenerId, ModuleWrapper, PausingModuleWrapper, SimulatedHandle};
use crate::tasks::{LogDisplay, MultiDisplay, ProgressMonitor, ProgressState, Severity, TaskBridge};

/// Demo run options
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Frames to run before ending the session
    pub frames: u64,
    pub frame_interval: Duration,
    /// Frame at which the host loses focus for a while
    pub unfocus_at: Option<u64>,
    /// Frame at which the simulated operation is cancelled
    pub cancel_at: Option<u64>,
    /// Work steps of the simulated operation
    pub work_steps: u32,
}

impl DemoOptions {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            frames: 240,
            frame_interval: Duration::from_millis(config.host.frame_interval_ms),
            unfocus_at: None,
            cancel_at: None,
            work_steps: 50,
        }
    }
}

/// Frames the host stays unfocused after `unfocus_at`
const UNFOCUSED_FRAMES: u64 = 30;

pub fn run(options: DemoOptions, config: BridgeConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build frame runtime")?;

    let (handle, controller) = SimulatedHandle::new(1);
    let tracker: Rc<RefCell<PausingModuleWrapper<SimulatedHandle>>> =
        Rc::new(RefCell::new(PausingModuleWrapper::new(ModuleWrapper::new("tracker"))));
    {
        let mut tracker = tracker.borrow_mut();
        tracker.on_connection_changed(|connected| info!("tracker connected: {}", connected));
        tracker.on_changes_taken(|mask: ChangeMask| info!("tracker changed fields: {:#06b}", mask.0));
        if !tracker.connect_handle(handle)? {
            warn!("tracker unavailable, continuing without it");
        }
    }

    let listener = ListenerId::new();
    tracker.borrow_mut().start_listening(listener);

    let bridge: Rc<RefCell<TaskBridge<u32>>> = Rc::new(RefCell::new(
        TaskBridge::new(MultiDisplay::new().with(LogDisplay::new())).with_config(config.tasks.clone()),
    ));

    let finished_steps = Rc::new(Cell::new(None));
    {
        let finished_steps = finished_steps.clone();
        let work_steps = options.work_steps;
        let step_time = options.frame_interval;
        bridge.borrow_mut().start_monitored(
            "Simulating session",
            move |state, monitor| {
                let started = Instant::now();
                monitor.report(ProgressState::Start);

                let mut done = 0;
                for step in 0..work_steps {
                    if state.is_cancelled() {
                        state.user_message("Simulation cancelled", Severity::Warning);
                        break;
                    }
                    thread::sleep(step_time);
                    controller.mark_changed(ChangeMask::bit(step % 4));
                    monitor.report(ProgressState::Continue {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                    done = step + 1;
                }

                monitor.report(ProgressState::Finished);
                state.info(format!("Simulated {} of {} steps", done, work_steps));
                done
            },
            move |steps| finished_steps.set(Some(steps)),
        )?;
    }

    let mut host = FrameHost::new();
    host.add(tracker.clone());
    host.add(bridge.clone());

    let unfocus_at = options.unfocus_at;
    let cancel_at = options.cancel_at;
    let frame_bridge = bridge.clone();
    let outcome = drive_session(&runtime, &mut host, &options, move |host| {
        let next = host.frame() + 1;
        if unfocus_at == Some(next) {
            host.set_focused(false);
        } else if unfocus_at.map(|at| at + UNFOCUSED_FRAMES) == Some(next) {
            host.set_focused(true);
        }
        if cancel_at == Some(next) {
            frame_bridge.borrow_mut().cancel();
        }
    });
    tracker.borrow_mut().stop_listening(listener);
    outcome?;

    match finished_steps.get() {
        Some(steps) => info!("Simulation finished after {} steps", steps),
        None => warn!("Simulation produced no result"),
    }
    Ok(())
}

/// Run the frame loop, then end the session whether or not a frame failed
fn drive_session<F>(
    runtime: &Runtime,
    host: &mut FrameHost,
    options: &DemoOptions,
    before_frame: F,
) -> HostResult<()>
where
    F: FnMut(&mut FrameHost),
{
    let outcome = runtime.block_on(run_frames(
        host,
        options.frame_interval,
        options.frames,
        before_frame,
    ));

    match &outcome {
        Ok(()) => {
            if let Err(e) = host.request_teardown() {
                warn!("{}; cancelling before shutdown", e);
            }
        }
        Err(e) => error!("Frame loop stopped at frame {}: {}", host.frame(), e),
    }
    host.end_session();
    outcome
}
