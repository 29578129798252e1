//! Module Wrapper
//!
//! Connection handshake, liveness tracking and per-frame change polling for one
//! native module handle.

use log::{debug, error, info, warn};

use super::callbacks::{CallbackId, CallbackRegistry};
use super::error::{HandleError, HandleResult};
use super::handle::ModuleHandle;
use crate::tasks::progress::{ProgressMonitor, SilentMonitor};

/// Wraps a native handle for one subsystem
pub struct ModuleWrapper<H: ModuleHandle> {
    name: String,
    handle: Option<H>,
    /// Set once a connect succeeded; status is not tracked before that
    connect_succeeded: bool,
    is_connected: bool,
    connect_monitor: Box<dyn ProgressMonitor>,
    connection_changed: CallbackRegistry<bool>,
    changes_taken: CallbackRegistry<H::Changes>,
}

impl<H: ModuleHandle> ModuleWrapper<H> {
    /// Create an unbound wrapper for the named subsystem
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: None,
            connect_succeeded: false,
            is_connected: false,
            connect_monitor: Box::new(SilentMonitor),
            connection_changed: CallbackRegistry::new(),
            changes_taken: CallbackRegistry::new(),
        }
    }

    /// Report connection attempts on `monitor` (for example a progress adapter)
    pub fn with_connect_monitor(mut self, monitor: Box<dyn ProgressMonitor>) -> Self {
        self.connect_monitor = monitor;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub(crate) fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Register a callback fired with the new state on every connection transition
    pub fn on_connection_changed(&mut self, callback: impl FnMut(bool) + 'static) -> CallbackId {
        self.connection_changed.add(callback)
    }

    /// Register a callback fired with every non-empty change mask
    pub fn on_changes_taken(&mut self, callback: impl FnMut(H::Changes) + 'static) -> CallbackId {
        self.changes_taken.add(callback)
    }

    /// Remove a callback registered with either `on_*` method
    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.connection_changed.remove(id) || self.changes_taken.remove(id)
    }

    /// Bind a native handle and try to connect it to the session
    pub fn connect_handle(&mut self, handle: H) -> HandleResult<bool> {
        if self.handle.is_some() {
            self.try_session_disconnect();
        }

        debug!("Binding {} to native handle {}", self.name, handle.id());
        self.handle = Some(handle);
        self.try_session_connect()
    }

    /// Attempt the native connect.
    ///
    /// Returns `Ok(false)` for expected "not ready" outcomes and `Err` for any
    /// other native failure.
    pub fn try_session_connect(&mut self) -> HandleResult<bool> {
        let Some(handle) = self.handle.as_mut() else {
            debug!("{}: no handle bound, skipping connect", self.name);
            return Ok(false);
        };

        match handle.session_connect(self.connect_monitor.as_mut()) {
            Ok(()) => {
                info!("{} connected (handle {})", self.name, handle.id());
                self.connect_succeeded = true;
                self.update_status();
                Ok(true)
            }
            Err(e) if e.is_expected() => {
                debug!("{} not available in this session: {}", self.name, e);
                Ok(false)
            }
            Err(e) => {
                error!("{} failed to connect: {}", self.name, e);
                Err(e)
            }
        }
    }

    /// Recompute the connection state and notify on transitions
    pub fn update_status(&mut self) {
        if !self.connect_succeeded {
            return;
        }

        let connected = self
            .handle
            .as_ref()
            .is_some_and(|h| h.is_valid() && h.session_connected());

        self.set_connected(connected);
    }

    /// Per-frame poll: update status, then take and dispatch changes
    pub fn check_changes(&mut self) -> HandleResult<()> {
        self.update_status();
        self.dispatch_changes()
    }

    /// Take the change mask and dispatch it if anything changed
    pub(crate) fn dispatch_changes(&mut self) -> HandleResult<()> {
        if !self.is_connected {
            return Ok(());
        }
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        let changes = match handle.take_changes() {
            Ok(changes) => changes,
            Err(e) => return self.classify(e),
        };

        if changes != H::Changes::default() {
            debug!("{} changes: {:?}", self.name, changes);
            self.changes_taken.emit(changes);
        }
        Ok(())
    }

    /// Disconnect from the session and drop the handle.
    ///
    /// Native failures are logged; the wrapper always ends up unbound.
    pub fn try_session_disconnect(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if handle.is_valid() && handle.session_connected() {
                match handle.session_disconnect() {
                    Ok(()) => info!("{} disconnected (handle {})", self.name, handle.id()),
                    Err(e) => warn!("{} failed to disconnect cleanly: {}", self.name, e),
                }
            } else {
                debug!("{} handle already disconnected", self.name);
            }
        }

        self.connect_succeeded = false;
        self.set_connected(false);
    }

    /// Swallow expected errors, propagate the rest
    pub(crate) fn classify(&self, e: HandleError) -> HandleResult<()> {
        if e.is_expected() {
            debug!("{}: {}", self.name, e);
            Ok(())
        } else {
            error!("{}: unexpected native error: {}", self.name, e);
            Err(e)
        }
    }

    fn set_connected(&mut self, connected: bool) {
        if self.is_connected == connected {
            return;
        }

        self.is_connected = connected;
        debug!("{} connection changed: {}", self.name, connected);
        self.connection_changed.emit(connected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::error::ResultCode;
    use crate::module::handle::ChangeMask;
    use crate::module::simulated::{SimulatedController, SimulatedHandle};
    use crate::tasks::progress::{ProgressAdapter, ProgressReply, ProgressState};
    use crate::tasks::state::TaskState;
    use crate::tasks::types::TaskEvent;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn wrapper() -> (ModuleWrapper<SimulatedHandle>, SimulatedHandle, SimulatedController) {
        let (handle, controller) = SimulatedHandle::new(1);
        (ModuleWrapper::<SimulatedHandle>::new("tracker"), handle, controller)
    }

    fn record_transitions(wrapper: &mut ModuleWrapper<SimulatedHandle>) -> Rc<RefCell<Vec<bool>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        wrapper.on_connection_changed(move |connected| sink.borrow_mut().push(connected));
        seen
    }

    #[test]
    fn test_connect_success() {
        let (mut wrapper, handle, controller) = wrapper();
        let transitions = record_transitions(&mut wrapper);

        assert!(wrapper.connect_handle(handle).unwrap());
        assert!(wrapper.is_connected());
        assert_eq!(controller.connect_calls(), 1);
        assert_eq!(*transitions.borrow(), vec![true]);
    }

    #[test]
    fn test_device_not_found_is_not_fatal() {
        let (mut wrapper, handle, controller) = wrapper();
        controller.fail_connect(Some(HandleError::DeviceNotFound("no headset".into())));

        assert!(!wrapper.connect_handle(handle).unwrap());
        assert!(!wrapper.is_connected());

        wrapper.check_changes().unwrap();
        assert!(!wrapper.is_connected());
    }

    #[test]
    fn test_unrecognized_error_propagates() {
        let (mut wrapper, handle, controller) = wrapper();
        controller.fail_connect(Some(HandleError::Native {
            code: ResultCode::Internal,
            message: "driver crashed".into(),
        }));

        let err = wrapper.connect_handle(handle).unwrap_err();
        assert_eq!(err.code(), ResultCode::Internal);
        assert!(!wrapper.is_connected());
    }

    #[test]
    fn test_retry_after_expected_failure() {
        let (mut wrapper, handle, controller) = wrapper();
        controller.fail_connect(Some(HandleError::NotSupportedInSession("editor".into())));
        assert!(!wrapper.connect_handle(handle).unwrap());

        controller.fail_connect(None);
        assert!(wrapper.try_session_connect().unwrap());
        assert!(wrapper.is_connected());
    }

    #[test]
    fn test_connection_changes_are_debounced() {
        let (mut wrapper, handle, controller) = wrapper();
        let transitions = record_transitions(&mut wrapper);
        wrapper.connect_handle(handle).unwrap();

        for _ in 0..3 {
            wrapper.update_status();
        }
        controller.set_session_connected(false);
        for _ in 0..3 {
            wrapper.update_status();
        }
        controller.set_session_connected(true);
        wrapper.update_status();
        controller.set_valid(false);
        wrapper.update_status();
        wrapper.update_status();

        let seen = transitions.borrow();
        assert_eq!(*seen, vec![true, false, true, false]);
        assert!(seen.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn test_changes_dispatched_only_when_non_empty() {
        let (mut wrapper, handle, controller) = wrapper();
        let taken = Rc::new(RefCell::new(Vec::new()));
        {
            let taken = taken.clone();
            wrapper.on_changes_taken(move |mask| taken.borrow_mut().push(mask));
        }
        wrapper.connect_handle(handle).unwrap();

        wrapper.check_changes().unwrap();
        assert!(taken.borrow().is_empty());

        controller.mark_changed(ChangeMask::bit(2));
        controller.mark_changed(ChangeMask::bit(4));
        wrapper.check_changes().unwrap();
        wrapper.check_changes().unwrap();

        assert_eq!(*taken.borrow(), vec![ChangeMask(0b10100)]);
    }

    #[test]
    fn test_expected_change_poll_error_is_swallowed() {
        let (mut wrapper, handle, controller) = wrapper();
        let taken = Rc::new(RefCell::new(Vec::new()));
        {
            let taken = taken.clone();
            wrapper.on_changes_taken(move |mask| taken.borrow_mut().push(mask));
        }
        wrapper.connect_handle(handle).unwrap();

        controller.mark_changed(ChangeMask::bit(0));
        controller.fail_take_changes(Some(HandleError::NotSupportedInSession("play mode".into())));
        wrapper.check_changes().unwrap();
        assert!(taken.borrow().is_empty());
        assert!(wrapper.is_connected());

        controller.fail_take_changes(None);
        wrapper.check_changes().unwrap();
        assert_eq!(*taken.borrow(), vec![ChangeMask::bit(0)]);
    }

    #[test]
    fn test_unexpected_change_poll_error_propagates() {
        let (mut wrapper, handle, controller) = wrapper();
        let taken = Rc::new(RefCell::new(Vec::new()));
        {
            let taken = taken.clone();
            wrapper.on_changes_taken(move |mask| taken.borrow_mut().push(mask));
        }
        wrapper.connect_handle(handle).unwrap();

        controller.mark_changed(ChangeMask::bit(1));
        controller.fail_take_changes(Some(HandleError::InvalidHandle(1)));
        let err = wrapper.check_changes().unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidHandle);
        assert!(taken.borrow().is_empty());
    }

    #[test]
    fn test_disconnect_tolerates_native_failure() {
        let (mut wrapper, handle, controller) = wrapper();
        let transitions = record_transitions(&mut wrapper);
        wrapper.connect_handle(handle).unwrap();

        controller.fail_disconnect(Some(HandleError::Native {
            code: ResultCode::Internal,
            message: "busy".into(),
        }));
        wrapper.try_session_disconnect();

        assert!(wrapper.handle().is_none());
        assert!(!wrapper.is_connected());
        assert_eq!(controller.disconnect_calls(), 1);
        assert_eq!(*transitions.borrow(), vec![true, false]);

        // Second call has nothing to do.
        wrapper.try_session_disconnect();
        assert_eq!(controller.disconnect_calls(), 1);
        assert_eq!(*transitions.borrow(), vec![true, false]);
    }

    #[test]
    fn test_connect_progress_through_adapter() {
        let state: Arc<TaskState<()>> = Arc::new(TaskState::new());
        let adapter = ProgressAdapter::new(state.clone(), "Connecting tracker");
        let (handle, controller) = SimulatedHandle::new(9);
        controller.set_connect_steps(2);

        let mut wrapper = ModuleWrapper::<SimulatedHandle>::new("tracker").with_connect_monitor(Box::new(adapter));
        assert!(wrapper.connect_handle(handle).unwrap());

        let events = state.events().drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], TaskEvent::progress("Connecting tracker", 0.0));
        assert!(state.is_complete());
    }

    #[test]
    fn test_cancelling_monitor_is_expected_failure() {
        struct Refuse;
        impl ProgressMonitor for Refuse {
            fn report(&mut self, _state: ProgressState) -> ProgressReply {
                ProgressReply::Cancel
            }
        }

        let (handle, _controller) = SimulatedHandle::new(3);
        let mut wrapper = ModuleWrapper::<SimulatedHandle>::new("tracker").with_connect_monitor(Box::new(Refuse));
        assert!(!wrapper.connect_handle(handle).unwrap());
    }
}
