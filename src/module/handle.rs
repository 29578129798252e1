//! Native Handle Abstraction
//!
//! Capabilities a session-scoped native resource exposes to the wrappers:
//! a base set (connect, liveness, take-changes) and an optional pause/resume
//! extension.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{BitOr, BitOrAssign};

use super::error::HandleResult;
use crate::tasks::progress::ProgressMonitor;

/// Identifier of a native handle
pub type HandleId = u64;

/// Base capability set of a native module handle
pub trait ModuleHandle {
    /// Changed-fields bitmask; `Default` means "nothing changed"
    type Changes: Copy + Default + PartialEq + Debug;

    /// Native handle identifier
    fn id(&self) -> HandleId;

    /// Whether the native handle is still alive
    fn is_valid(&self) -> bool;

    /// Connect the handle to the current session, reporting progress on `monitor`
    fn session_connect(&mut self, monitor: &mut dyn ProgressMonitor) -> HandleResult<()>;

    /// Whether the session side still considers the handle connected
    fn session_connected(&self) -> bool;

    fn session_disconnect(&mut self) -> HandleResult<()>;

    /// Read and clear the changed-fields bitmask in one native call
    fn take_changes(&mut self) -> HandleResult<Self::Changes>;
}

/// Extension for handles whose underlying activity can be suspended
pub trait PausableHandle: ModuleHandle {
    fn is_paused(&self) -> bool;

    fn pause(&mut self) -> HandleResult<()>;

    fn resume(&mut self) -> HandleResult<()>;
}

/// Plain 32-bit changed-fields mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeMask(pub u32);

impl ChangeMask {
    pub const NONE: Self = Self(0);

    /// Mask with only field `index` set; empty for `index >= 32`
    pub fn bit(index: u32) -> Self {
        1u32.checked_shl(index).map_or(Self::NONE, Self)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ChangeMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangeMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
