//! Native Handle Error Types
//!
//! Errors raised by the native session layer, with a machine-checkable code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result code carried by every native failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    DeviceNotFound,
    NotSupportedInSession,
    HandleNotConnected,
    InvalidHandle,
    Internal,
}

impl ResultCode {
    /// Codes that mean "not ready yet" rather than a broken contract
    pub fn is_expected(self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound | Self::NotSupportedInSession | Self::HandleNotConnected
        )
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceNotFound => write!(f, "device_not_found"),
            Self::NotSupportedInSession => write!(f, "not_supported_in_session"),
            Self::HandleNotConnected => write!(f, "handle_not_connected"),
            Self::InvalidHandle => write!(f, "invalid_handle"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Native handle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Not supported in this session: {0}")]
    NotSupportedInSession(String),

    #[error("Handle not connected")]
    NotConnected,

    #[error("Invalid native handle {0}")]
    InvalidHandle(u64),

    #[error("Native call failed ({code}): {message}")]
    Native { code: ResultCode, message: String },
}

impl HandleError {
    pub fn code(&self) -> ResultCode {
        match self {
            Self::DeviceNotFound(_) => ResultCode::DeviceNotFound,
            Self::NotSupportedInSession(_) => ResultCode::NotSupportedInSession,
            Self::NotConnected => ResultCode::HandleNotConnected,
            Self::InvalidHandle(_) => ResultCode::InvalidHandle,
            Self::Native { code, .. } => *code,
        }
    }

    /// Whether this error is a recoverable "not ready" condition
    pub fn is_expected(&self) -> bool {
        self.code().is_expected()
    }
}

/// Result type alias for native handle operations
pub type HandleResult<T> = Result<T, HandleError>;
