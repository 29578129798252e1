//! Frame Host
//!
//! Drives task bridges and module wrappers from a single-threaded per-frame tick.

use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use super::error::{HostError, HostResult};
use crate::module::handle::{ModuleHandle, PausableHandle};
use crate::module::pausing::PausingModuleWrapper;
use crate::module::wrapper::ModuleWrapper;
use crate::tasks::bridge::TaskBridge;

/// Per-frame information handed to every participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    /// Frame counter, starting at 1
    pub frame: u64,
    /// Whether the host window has input focus
    pub focused: bool,
}

/// Something the host polls once per frame
pub trait FramePolled {
    /// Label used in host logs and errors
    fn name(&self) -> String;

    fn poll(&mut self, ctx: &FrameContext) -> HostResult<()>;

    /// The owning session is ending
    fn end_session(&mut self) {}

    /// Refuse teardown of the execution context while work is in flight
    fn guard_teardown(&self) -> HostResult<()> {
        Ok(())
    }
}

impl<H: ModuleHandle> FramePolled for ModuleWrapper<H> {
    fn name(&self) -> String {
        ModuleWrapper::name(self).to_string()
    }

    fn poll(&mut self, _ctx: &FrameContext) -> HostResult<()> {
        self.check_changes().map_err(|source| HostError::Module {
            module: FramePolled::name(self),
            source,
        })
    }

    fn end_session(&mut self) {
        self.try_session_disconnect();
    }
}

impl<H: PausableHandle> FramePolled for PausingModuleWrapper<H> {
    fn name(&self) -> String {
        PausingModuleWrapper::name(self).to_string()
    }

    fn poll(&mut self, ctx: &FrameContext) -> HostResult<()> {
        self.set_host_focused(ctx.focused);
        self.check_changes().map_err(|source| HostError::Module {
            module: FramePolled::name(self),
            source,
        })
    }

    fn end_session(&mut self) {
        self.try_session_disconnect();
    }
}

impl<T: Default + Send + 'static> FramePolled for TaskBridge<T> {
    fn name(&self) -> String {
        format!("task bridge ({})", self.current_task().unwrap_or("idle"))
    }

    fn poll(&mut self, _ctx: &FrameContext) -> HostResult<()> {
        self.tick();
        Ok(())
    }

    fn end_session(&mut self) {
        self.cancel();
        self.finish();
    }

    fn guard_teardown(&self) -> HostResult<()> {
        TaskBridge::guard_teardown(self).map_err(|source| HostError::TeardownRefused {
            participant: FramePolled::name(self),
            source,
        })
    }
}

/// Shared participants stay reachable by the caller after registration
impl<P: FramePolled> FramePolled for Rc<RefCell<P>> {
    fn name(&self) -> String {
        self.borrow().name()
    }

    fn poll(&mut self, ctx: &FrameContext) -> HostResult<()> {
        self.borrow_mut().poll(ctx)
    }

    fn end_session(&mut self) {
        self.borrow_mut().end_session()
    }

    fn guard_teardown(&self) -> HostResult<()> {
        self.borrow().guard_teardown()
    }
}

/// Single-threaded frame driver
pub struct FrameHost {
    participants: Vec<Box<dyn FramePolled>>,
    frame: u64,
    focused: bool,
}

impl FrameHost {
    pub fn new() -> Self {
        Self {
            participants: Vec::new(),
            frame: 0,
            focused: true,
        }
    }

    /// Register a participant; polled in registration order
    pub fn add(&mut self, participant: impl FramePolled + 'static) {
        debug!("Registered frame participant: {}", participant.name());
        self.participants.push(Box::new(participant));
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            info!("Host focus changed: {}", focused);
        }
        self.focused = focused;
    }

    /// Poll every participant once. All participants are polled even after a
    /// failure; the first failure is returned.
    pub fn tick(&mut self) -> HostResult<()> {
        self.frame += 1;
        let ctx = FrameContext {
            frame: self.frame,
            focused: self.focused,
        };

        let mut first_error = None;
        for participant in &mut self.participants {
            if let Err(e) = participant.poll(&ctx) {
                debug!("{} failed at frame {}: {}", participant.name(), ctx.frame, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Ask whether the execution context may be torn down now
    pub fn request_teardown(&self) -> HostResult<()> {
        for participant in &self.participants {
            participant.guard_teardown()?;
        }
        info!("Teardown allowed at frame {}", self.frame);
        Ok(())
    }

    /// End the session for every participant: disconnect handles, stop tasks
    pub fn end_session(&mut self) {
        for participant in &mut self.participants {
            debug!("Ending session for {}", participant.name());
            participant.end_session();
        }
        info!("Session ended after {} frames", self.frame);
    }
}

impl Default for FrameHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Tick `host` on a fixed interval for `frames` frames, calling `before_frame`
/// ahead of each tick.
pub async fn run_frames<F>(
    host: &mut FrameHost,
    frame_interval: Duration,
    frames: u64,
    mut before_frame: F,
) -> HostResult<()>
where
    F: FnMut(&mut FrameHost),
{
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for _ in 0..frames {
        ticker.tick().await;
        before_frame(host);
        host.tick()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::error::{HandleError, ResultCode};
    use crate::module::handle::ChangeMask;
    use crate::module::pausing::ListenerId;
    use crate::module::simulated::SimulatedHandle;
    use crate::tasks::display::LogDisplay;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_focus_flows_to_pausing_wrappers() {
        let (handle, controller) = SimulatedHandle::new(1);
        let wrapper: Rc<RefCell<PausingModuleWrapper<SimulatedHandle>>> =
            Rc::new(RefCell::new(PausingModuleWrapper::new(ModuleWrapper::new("tracker"))));
        wrapper.borrow_mut().connect_handle(handle).unwrap();
        wrapper.borrow_mut().start_listening(ListenerId::new());

        let mut host = FrameHost::new();
        host.add(wrapper.clone());

        host.tick().unwrap();
        assert!(!controller.is_paused());

        host.set_focused(false);
        host.tick().unwrap();
        assert!(controller.is_paused());
        assert_eq!(host.frame(), 2);
    }

    #[test]
    fn test_failure_does_not_stop_other_participants() {
        let (broken, broken_ctl) = SimulatedHandle::new(1);
        let (healthy, healthy_ctl) = SimulatedHandle::new(2);

        // No listeners, so the first poll tries to pause and fails.
        let mut first = PausingModuleWrapper::new(ModuleWrapper::<SimulatedHandle>::new("broken"));
        first.connect_handle(broken).unwrap();
        broken_ctl.fail_pause(Some(HandleError::Native {
            code: ResultCode::InvalidHandle,
            message: "gone".into(),
        }));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut second = ModuleWrapper::<SimulatedHandle>::new("healthy");
        {
            let seen = seen.clone();
            second.on_changes_taken(move |mask: ChangeMask| seen.borrow_mut().push(mask));
        }
        second.connect_handle(healthy).unwrap();

        let mut host = FrameHost::new();
        host.add(first);
        host.add(second);

        healthy_ctl.mark_changed(ChangeMask::bit(0));
        let err = host.tick().unwrap_err();
        assert!(matches!(err, HostError::Module { ref module, .. } if module == "broken"));
        assert_eq!(*seen.borrow(), vec![ChangeMask::bit(0)]);
    }

    #[test]
    fn test_teardown_refused_while_task_runs() {
        let release = Arc::new(AtomicBool::new(false));
        let bridge: Rc<RefCell<TaskBridge<()>>> = Rc::new(RefCell::new(TaskBridge::new(LogDisplay::new())));
        let mut host = FrameHost::new();
        host.add(bridge.clone());

        assert!(host.request_teardown().is_ok());

        let gate = release.clone();
        bridge
            .borrow_mut()
            .start(
                "simulate",
                move |_| {
                    while !gate.load(Ordering::Acquire) {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                },
                |_| {},
            )
            .unwrap();

        assert_eq!(bridge.name(), "task bridge (simulate)");
        assert!(matches!(
            host.request_teardown(),
            Err(HostError::TeardownRefused { ref participant, .. }) if participant == "task bridge (simulate)"
        ));

        release.store(true, Ordering::Release);
        while !bridge.borrow().is_idle() {
            host.tick().unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(bridge.name(), "task bridge (idle)");
        assert!(host.request_teardown().is_ok());
    }

    #[test]
    fn test_end_session_disconnects_and_stops() {
        let (handle, controller) = SimulatedHandle::new(4);
        let mut wrapper = ModuleWrapper::<SimulatedHandle>::new("tracker");
        wrapper.connect_handle(handle).unwrap();

        let bridge: Rc<RefCell<TaskBridge<u8>>> = Rc::new(RefCell::new(TaskBridge::new(LogDisplay::new())));
        bridge
            .borrow_mut()
            .start(
                "until cancelled",
                |state| {
                    while !state.is_cancelled() {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    state.set_result(9);
                },
                |_| {},
            )
            .unwrap();

        let mut host = FrameHost::new();
        host.add(wrapper);
        host.add(bridge.clone());
        host.tick().unwrap();

        host.end_session();
        assert_eq!(controller.disconnect_calls(), 1);
        assert!(bridge.borrow().is_idle());
        assert_eq!(
            bridge.borrow().last_run().and_then(|r| r.outcome),
            Some(crate::tasks::types::TaskOutcome::Cancelled)
        );
    }

    #[test]
    fn test_run_frames_on_interval() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let mut host = FrameHost::new();
        let mut seen = Vec::new();
        runtime
            .block_on(run_frames(&mut host, Duration::from_millis(1), 5, |host| {
                seen.push(host.frame())
            }))
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(host.frame(), 5);
    }
}
