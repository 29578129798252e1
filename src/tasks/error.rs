//! Task Error Types

use thiserror::Error;

/// Task bridge errors
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task '{0}' is still running")]
    Busy(String),

    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

/// Result type alias for task bridge operations
pub type TaskResult<T> = Result<T, TaskError>;
