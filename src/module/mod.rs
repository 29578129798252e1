//! Module Wrappers
//!
//! Connection and change polling for session-scoped native handles:
//! - Connect/disconnect handshake with expected-error classification
//! - Debounced connection notifications
//! - Take-and-clear change dispatch once per frame
//! - Listener-driven pause/resume of handle activity

pub mod callbacks;
pub mod error;
pub mod handle;
pub mod pausing;
pub mod simulated;
pub mod wrapper;

pub use callbacks::{CallbackId, CallbackRegistry};
pub use error::{HandleError, HandleResult, ResultCode};
pub use handle::{ChangeMask, HandleId, ModuleHandle, PausableHandle};
pub use pausing::{ListenerId, PausingModuleWrapper};
pub use simulated::{SimulatedController, SimulatedHandle};
pub use wrapper::ModuleWrapper;
