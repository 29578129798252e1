//! Simulated Native Handle
//!
//! In-process stand-in for a pausable native module handle. The paired
//! [`SimulatedController`] scripts its outcomes and inspects the calls it
//! received, from any thread.

use parking_lot::Mutex;
use std::sync::Arc;

use super::error::{HandleError, HandleResult};
use super::handle::{ChangeMask, HandleId, ModuleHandle, PausableHandle};
use crate::tasks::progress::{ProgressMonitor, ProgressReply, ProgressState};

#[derive(Debug, Default)]
struct SimState {
    valid: bool,
    session_connected: bool,
    paused: bool,
    changes: ChangeMask,
    connect_steps: u32,
    connect_error: Option<HandleError>,
    disconnect_error: Option<HandleError>,
    pause_error: Option<HandleError>,
    resume_error: Option<HandleError>,
    take_changes_error: Option<HandleError>,
    connect_calls: u32,
    disconnect_calls: u32,
    pause_calls: u32,
    resume_calls: u32,
}

/// Pausable handle backed by shared in-memory state
#[derive(Debug)]
pub struct SimulatedHandle {
    id: HandleId,
    shared: Arc<Mutex<SimState>>,
}

/// Scripting and inspection side of a [`SimulatedHandle`]
#[derive(Debug, Clone)]
pub struct SimulatedController {
    shared: Arc<Mutex<SimState>>,
}

impl SimulatedHandle {
    /// Create a live, unconnected handle and its controller
    pub fn new(id: HandleId) -> (Self, SimulatedController) {
        let shared = Arc::new(Mutex::new(SimState {
            valid: true,
            connect_steps: 3,
            ..SimState::default()
        }));

        (
            Self {
                id,
                shared: shared.clone(),
            },
            SimulatedController { shared },
        )
    }
}

impl ModuleHandle for SimulatedHandle {
    type Changes = ChangeMask;

    fn id(&self) -> HandleId {
        self.id
    }

    fn is_valid(&self) -> bool {
        self.shared.lock().valid
    }

    fn session_connect(&mut self, monitor: &mut dyn ProgressMonitor) -> HandleResult<()> {
        let (steps, scripted_error) = {
            let mut state = self.shared.lock();
            state.connect_calls += 1;
            if !state.valid {
                return Err(HandleError::InvalidHandle(self.id));
            }
            (state.connect_steps, state.connect_error.clone())
        };

        monitor.report(ProgressState::Start);
        for step in 1..=steps {
            let reply = monitor.report(ProgressState::Continue {
                elapsed_ms: u64::from(step) * 100,
            });
            if reply == ProgressReply::Cancel {
                monitor.report(ProgressState::Finished);
                return Err(HandleError::NotConnected);
            }
        }
        monitor.report(ProgressState::Finished);

        if let Some(error) = scripted_error {
            return Err(error);
        }

        let mut state = self.shared.lock();
        state.session_connected = true;
        state.paused = false;
        Ok(())
    }

    fn session_connected(&self) -> bool {
        self.shared.lock().session_connected
    }

    fn session_disconnect(&mut self) -> HandleResult<()> {
        let mut state = self.shared.lock();
        state.disconnect_calls += 1;
        if let Some(error) = state.disconnect_error.clone() {
            return Err(error);
        }
        state.session_connected = false;
        Ok(())
    }

    fn take_changes(&mut self) -> HandleResult<ChangeMask> {
        let mut state = self.shared.lock();
        if !state.session_connected {
            return Err(HandleError::NotConnected);
        }
        if let Some(error) = state.take_changes_error.clone() {
            return Err(error);
        }
        Ok(std::mem::take(&mut state.changes))
    }
}

impl PausableHandle for SimulatedHandle {
    fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    fn pause(&mut self) -> HandleResult<()> {
        let mut state = self.shared.lock();
        state.pause_calls += 1;
        if let Some(error) = state.pause_error.clone() {
            return Err(error);
        }
        state.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> HandleResult<()> {
        let mut state = self.shared.lock();
        state.resume_calls += 1;
        if let Some(error) = state.resume_error.clone() {
            return Err(error);
        }
        state.paused = false;
        Ok(())
    }
}

impl SimulatedController {
    /// Record changed fields. Ignored while the handle is paused or disconnected.
    pub fn mark_changed(&self, mask: ChangeMask) -> bool {
        let mut state = self.shared.lock();
        if state.paused || !state.session_connected {
            return false;
        }
        state.changes |= mask;
        true
    }

    /// Make the next connect attempts fail with `error`
    pub fn fail_connect(&self, error: Option<HandleError>) {
        self.shared.lock().connect_error = error;
    }

    pub fn fail_disconnect(&self, error: Option<HandleError>) {
        self.shared.lock().disconnect_error = error;
    }

    pub fn fail_pause(&self, error: Option<HandleError>) {
        self.shared.lock().pause_error = error;
    }

    pub fn fail_resume(&self, error: Option<HandleError>) {
        self.shared.lock().resume_error = error;
    }

    /// Make change polls fail with `error`; pending changes are kept
    pub fn fail_take_changes(&self, error: Option<HandleError>) {
        self.shared.lock().take_changes_error = error;
    }

    /// Number of `Continue` reports sent while connecting
    pub fn set_connect_steps(&self, steps: u32) {
        self.shared.lock().connect_steps = steps;
    }

    /// Simulate the native side destroying or restoring the handle
    pub fn set_valid(&self, valid: bool) {
        self.shared.lock().valid = valid;
    }

    /// Simulate the session dropping or regaining the handle
    pub fn set_session_connected(&self, connected: bool) {
        self.shared.lock().session_connected = connected;
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn connect_calls(&self) -> u32 {
        self.shared.lock().connect_calls
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.shared.lock().disconnect_calls
    }

    pub fn pause_calls(&self) -> u32 {
        self.shared.lock().pause_calls
    }

    pub fn resume_calls(&self) -> u32 {
        self.shared.lock().resume_calls
    }
}
