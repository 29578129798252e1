//! simbridge
//!
//! Core of an editor-hosted front end for a native simulation session:
//! a task bridge that surfaces background work to a frame-driven host, and
//! module wrappers that connect, poll and pause native handles.

// Declare modules
pub mod config;
pub mod demo;
pub mod host;
pub mod module;
pub mod tasks;

pub use config::BridgeConfig;
pub use demo::{run, DemoOptions};
