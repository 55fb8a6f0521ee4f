//! Error types for the client layer.

use atelier_core::{GraphError, MediaError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response. `detail` is the backend's message, shown as-is.
    #[error("{detail}")]
    Backend { status: u16, detail: String },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl ApiClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::Backend { status, .. } => Some(*status),
            ApiClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The task reached a failure state. Carries the server message verbatim.
    #[error("{0}")]
    TaskFailed(String),
    #[error("Failed to get task status.")]
    Status(#[source] ApiClientError),
    #[error("Polling was cancelled")]
    Cancelled,
    #[error("Polling task aborted: {0}")]
    Aborted(String),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to capture frame: {0}")]
    FrameCapture(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Poll(PollError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_failure_displays_server_text_only() {
        let err = WorkflowError::from(PollError::TaskFailed("quota exceeded".into()));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn backend_detail_is_verbatim() {
        let err = ApiClientError::Backend {
            status: 403,
            detail: "User is not a member of this project.".into(),
        };
        assert_eq!(err.to_string(), "User is not a member of this project.");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn status_errors_are_generic() {
        let err = PollError::Status(ApiClientError::InvalidResponse("boom".into()));
        assert_eq!(err.to_string(), "Failed to get task status.");
    }

    #[test]
    fn missing_gcs_uri_message() {
        let err = WorkflowError::FrameCapture("No GCS URI returned.".into());
        assert_eq!(
            err.to_string(),
            "Failed to capture frame: No GCS URI returned."
        );
    }
}
