//! Pausing Module Wrapper
//!
//! Decorator over [`ModuleWrapper`] that suspends a handle's native activity
//! while nobody listens or the host is in the background. Listener changes only
//! record interest; the pause decision is reconciled on the next poll.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::callbacks::CallbackId;
use super::error::HandleResult;
use super::handle::PausableHandle;
use super::wrapper::ModuleWrapper;

/// Opaque listener identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(uuid::Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// What the reconcile step decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseAction {
    Pause,
    Resume,
    None,
}

/// Pause decision for one poll
pub fn pause_action(host_focused: bool, listeners: usize, paused: bool) -> PauseAction {
    if !host_focused {
        if paused {
            PauseAction::None
        } else {
            PauseAction::Pause
        }
    } else if listeners > 0 && paused {
        PauseAction::Resume
    } else if listeners == 0 && !paused {
        PauseAction::Pause
    } else {
        PauseAction::None
    }
}

/// Module wrapper whose handle runs only while observed
pub struct PausingModuleWrapper<H: PausableHandle> {
    inner: ModuleWrapper<H>,
    listeners: HashSet<ListenerId>,
    host_focused: bool,
}

impl<H: PausableHandle> PausingModuleWrapper<H> {
    pub fn new(inner: ModuleWrapper<H>) -> Self {
        Self {
            inner,
            listeners: HashSet::new(),
            host_focused: true,
        }
    }

    pub fn inner(&self) -> &ModuleWrapper<H> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn handle(&self) -> Option<&H> {
        self.inner.handle()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn connect_handle(&mut self, handle: H) -> HandleResult<bool> {
        self.inner.connect_handle(handle)
    }

    pub fn try_session_connect(&mut self) -> HandleResult<bool> {
        self.inner.try_session_connect()
    }

    pub fn try_session_disconnect(&mut self) {
        self.inner.try_session_disconnect()
    }

    pub fn on_connection_changed(&mut self, callback: impl FnMut(bool) + 'static) -> CallbackId {
        self.inner.on_connection_changed(callback)
    }

    pub fn on_changes_taken(&mut self, callback: impl FnMut(H::Changes) + 'static) -> CallbackId {
        self.inner.on_changes_taken(callback)
    }

    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.inner.remove_callback(id)
    }

    /// Register interest. Returns false if `id` was already listening.
    pub fn start_listening(&mut self, id: ListenerId) -> bool {
        self.listeners.insert(id)
    }

    /// Drop interest. Returns false if `id` was not listening.
    pub fn stop_listening(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_host_focused(&self) -> bool {
        self.host_focused
    }

    /// Record whether the host window has input focus
    pub fn set_host_focused(&mut self, focused: bool) {
        self.host_focused = focused;
    }

    /// Base status update followed by the pause reconcile
    pub fn update_status(&mut self) -> HandleResult<()> {
        self.inner.update_status();
        if !self.inner.is_connected() {
            return Ok(());
        }

        let listeners = self.listeners.len();
        let focused = self.host_focused;
        let name = self.inner.name().to_string();
        let Some(handle) = self.inner.handle_mut() else {
            return Ok(());
        };

        let outcome = match pause_action(focused, listeners, handle.is_paused()) {
            PauseAction::Pause => {
                debug!("Pausing {} (listeners: {}, focused: {})", name, listeners, focused);
                handle.pause()
            }
            PauseAction::Resume => {
                debug!("Resuming {} (listeners: {})", name, listeners);
                handle.resume()
            }
            PauseAction::None => Ok(()),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(e) => self.inner.classify(e),
        }
    }

    /// Per-frame poll: reconcile pause state, then take and dispatch changes
    pub fn check_changes(&mut self) -> HandleResult<()> {
        self.update_status()?;
        self.inner.dispatch_changes()
    }
}
