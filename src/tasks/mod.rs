//! Tasks Module
//!
//! Background work surfaced to a frame-driven host.
//! Handles worker threads, event streaming, progress reporting and cooperative cancellation.

pub mod bridge;
pub mod channel;
pub mod display;
pub mod error;
pub mod progress;
pub mod state;
pub mod types;

pub use bridge::TaskBridge;
pub use channel::EventChannel;
pub use display::{LogDisplay, MultiDisplay, TaskDisplay};
pub use error::{TaskError, TaskResult};
pub use progress::{ProgressAdapter, ProgressMonitor, ProgressReply, ProgressState, SilentMonitor};
pub use state::TaskState;
pub use types::{BridgeStatus, Severity, TaskEvent, TaskOutcome, TaskRecord};
