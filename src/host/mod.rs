//! Host Module
//!
//! Single-threaded frame driver for task bridges and module wrappers, with
//! focus tracking, the teardown guard and session shutdown.

pub mod error;
pub mod frame;

pub use error::{HostError, HostResult};
pub use frame::{run_frames, FrameContext, FrameHost, FramePolled};
