use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names that end a task's event stream.
pub const TERMINAL_TASK_EVENTS: [&str; 3] = ["task.completed", "task.failed", "task.cancelled"];

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One decoded event-stream frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStreamEvent {
    pub event: String,
    pub data: Value,
}

impl ParsedStreamEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Owner session id carried by the event payload, if any.
    pub fn session_id(&self) -> Option<u64> {
        read_session_id(&self.data)
    }
}

/// Task lifecycle state reported by `GET /tasks/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Case-insensitive parse of a wire status value.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// True when `name` is in the terminal event set, ignoring ASCII case.
pub fn is_terminal_event(name: &str) -> bool {
    TERMINAL_TASK_EVENTS
        .iter()
        .any(|terminal| terminal.eq_ignore_ascii_case(name.trim()))
}

/// True when a raw status string names a terminal task state.
pub fn is_terminal_task_status(status: Option<&str>) -> bool {
    status
        .and_then(TaskStatus::parse)
        .is_some_and(|status| status.is_terminal())
}

/// `status` string field of a task body.
pub fn read_task_status(body: &Value) -> Option<&str> {
    body.get("status").and_then(Value::as_str)
}

/// Owner session id of a task/session body, accepting both key spellings.
pub fn read_session_id(body: &Value) -> Option<u64> {
    ["sessionId", "session_id"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_u64))
}
