//! Task Types
//!
//! Type definitions shared by the worker side and the host side of the task bridge.

use serde::{Deserialize, Serialize};

/// Severity of a user-facing message raised by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Status event streamed from a worker thread to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskEvent {
    /// Progress update; `percent_done` is a fraction in `[0, 1]`
    Progress { message: String, percent_done: f32 },

    /// Informational message
    Info { message: String },

    /// Task-level error. Does not end the task by itself.
    Error { message: String },

    /// Message meant for the user, routed by severity
    UserMessage { message: String, severity: Severity },
}

impl TaskEvent {
    pub fn progress(message: impl Into<String>, percent_done: f32) -> Self {
        Self::Progress {
            message: message.into(),
            percent_done,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn user_message(message: impl Into<String>, severity: Severity) -> Self {
        Self::UserMessage {
            message: message.into(),
            severity,
        }
    }

    /// Event name used in dispatch traces and when forwarding to UI collaborators
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "task:progress",
            Self::Info { .. } => "task:info",
            Self::Error { .. } => "task:error",
            Self::UserMessage { .. } => "task:user-message",
        }
    }
}

/// Task bridge status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    /// No task; `start` is accepted
    Idle,
    /// Worker thread is running and being polled
    Running,
    /// Completion observed, worker is being joined
    Completing,
    /// Cancellation requested, waiting for the worker to notice
    Cancelling,
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completing => write!(f, "completing"),
            Self::Cancelling => write!(f, "cancelling"),
        }
    }
}

/// How a task run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    Cancelled,
    /// Worker thread panicked; the panic was logged at join time
    Panicked,
}

/// Bookkeeping for one task run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique run ID
    pub id: String,
    /// Task name for display
    pub name: String,
    /// Started timestamp
    pub started_at: String,
    /// Finished timestamp
    pub finished_at: Option<String>,
    pub outcome: Option<TaskOutcome>,
}

impl TaskRecord {
    /// Create a record for a run that is starting now
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            outcome: None,
        }
    }

    /// Mark the run as finished
    pub fn finish(&mut self, outcome: TaskOutcome) {
        self.outcome = Some(outcome);
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> Option<u64> {
        let start = chrono::DateTime::parse_from_rfc3339(&self.started_at).ok()?;
        let end = chrono::DateTime::parse_from_rfc3339(self.finished_at.as_ref()?).ok()?;

        Some((end - start).num_milliseconds().max(0) as u64)
    }
}
