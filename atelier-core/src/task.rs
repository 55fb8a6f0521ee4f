//! Task status vocabulary and the polling envelope.
//!
//! The backend reports task progress with two vocabularies depending on the
//! endpoint: `SUCCESS`/`FAILURE` for video work and `completed`/`failed` for
//! image work. Both are folded into [`TaskStatus`] at deserialization time so
//! nothing above this module ever sees the raw strings.

use crate::TaskId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Message used when a failed task carries no error text.
pub const TASK_FAILED_FALLBACK: &str = "Task failed";

/// Normalized status of a server-side task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// Fold a wire status into the internal vocabulary.
    ///
    /// Unknown strings are treated as still running: only an explicit
    /// success or failure may terminate a poll.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "completed" => TaskStatus::Succeeded,
            "failure" | "failed" => TaskStatus::Failed,
            "pending" | "queued" => TaskStatus::Pending,
            _ => TaskStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TaskStatus::from_wire(&raw))
    }
}

/// Body of `GET /api/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskEnvelope {
    /// Server-supplied error text, or the generic fallback.
    pub fn failure_message(&self) -> String {
        match self.error.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => TASK_FAILED_FALLBACK.to_string(),
        }
    }
}

/// Response of every asynchronous submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub task_id: TaskId,
}

/// Client-side mirror of a tracked task.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }

    /// Fold a polling response into the mirror.
    pub fn apply(&mut self, envelope: TaskEnvelope) {
        self.status = envelope.status;
        if envelope.status == TaskStatus::Failed {
            self.error = Some(envelope.failure_message());
        }
        self.result = envelope.result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn both_vocabularies_normalize() {
        assert_eq!(TaskStatus::from_wire("SUCCESS"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::from_wire("completed"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::from_wire("FAILURE"), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_wire("failed"), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_wire("PENDING"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_wire("RUNNING"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_wire("processing"), TaskStatus::Running);
    }

    #[test]
    fn envelope_deserializes_raw_status() {
        let envelope: TaskEnvelope =
            serde_json::from_str(r#"{"status":"FAILURE","error":"quota exceeded"}"#).unwrap();
        assert_eq!(envelope.status, TaskStatus::Failed);
        assert_eq!(envelope.failure_message(), "quota exceeded");
    }

    #[test]
    fn blank_error_falls_back() {
        let envelope: TaskEnvelope =
            serde_json::from_str(r#"{"status":"failed","error":"  "}"#).unwrap();
        assert_eq!(envelope.failure_message(), TASK_FAILED_FALLBACK);
    }

    #[test]
    fn task_mirror_records_failure() {
        let mut task = Task::new(TaskId::from("t9"));
        task.apply(TaskEnvelope {
            status: TaskStatus::Failed,
            result: None,
            error: None,
        });
        assert_eq!(task.error.as_deref(), Some(TASK_FAILED_FALLBACK));
    }

    proptest! {
        #[test]
        fn only_known_words_terminate(raw in "[a-zA-Z_]{0,12}") {
            let status = TaskStatus::from_wire(&raw);
            let lower = raw.to_ascii_lowercase();
            let known = matches!(
                lower.as_str(),
                "success" | "succeeded" | "completed" | "failure" | "failed"
            );
            prop_assert_eq!(status.is_terminal(), known);
        }
    }
}
