//! Frame Host Error Types

use thiserror::Error;

use crate::module::error::HandleError;
use crate::tasks::error::TaskError;

/// Errors surfaced by the frame host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Teardown refused by {participant}: {source}")]
    TeardownRefused {
        participant: String,
        #[source]
        source: TaskError,
    },

    #[error("Module {module} failed: {source}")]
    Module {
        module: String,
        #[source]
        source: HandleError,
    },
}

/// Result type alias for frame host operations
pub type HostResult<T> = Result<T, HostError>;
