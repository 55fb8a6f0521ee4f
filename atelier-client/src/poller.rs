//! Task polling.
//!
//! A poll issues `GET /api/tasks/{id}` on a fixed interval until the task
//! reaches a terminal state. There is no attempt limit; every poll is bound to
//! a [`CancellationToken`] that is checked while a status request is in flight
//! and during the sleep before each reschedule.

use crate::api::StudioApi;
use crate::PollError;
use atelier_core::{ImageGenerationResult, TaskId, TaskStatus, VideoGenerationResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Clone)]
pub struct TaskPoller {
    api: Arc<dyn StudioApi>,
    interval: Duration,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn StudioApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the task terminates or `cancel` fires.
    ///
    /// Resolves with the raw result payload. A succeeded task with no payload
    /// resolves with `Value::Null`.
    pub async fn poll(&self, task_id: &TaskId, cancel: &CancellationToken) -> Result<Value, PollError> {
        let mut attempts: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            attempts += 1;
            let envelope = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                response = self.api.task_status(task_id) => response.map_err(|err| {
                    tracing::warn!(task_id = %task_id, error = %err, "task status request failed");
                    PollError::Status(err)
                })?,
            };

            match envelope.status {
                TaskStatus::Succeeded => {
                    tracing::debug!(task_id = %task_id, attempts, "task succeeded");
                    return Ok(envelope.result.unwrap_or(Value::Null));
                }
                TaskStatus::Failed => {
                    let message = envelope.failure_message();
                    tracing::info!(task_id = %task_id, attempts, error = %message, "task failed");
                    return Err(PollError::TaskFailed(message));
                }
                status => {
                    tracing::debug!(task_id = %task_id, attempts, %status, "task not finished");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Poll a video task and extract its result.
    pub async fn poll_video_result(
        &self,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<VideoGenerationResult, PollError> {
        let value = self.poll(task_id, cancel).await?;
        let result = VideoGenerationResult::from_value(value)?;
        result.ensure_videos()?;
        Ok(result)
    }

    /// Poll an image task (generation, enrichment or imitation).
    pub async fn poll_image_result(
        &self,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<ImageGenerationResult, PollError> {
        let value = self.poll(task_id, cancel).await?;
        let result = ImageGenerationResult::from_value(value)?;
        result.ensure_images()?;
        Ok(result)
    }

    /// Run the poll on the runtime and hand back a handle that owns it.
    pub fn spawn(&self, task_id: TaskId) -> PollHandle {
        let cancel = CancellationToken::new();
        let poller = self.clone();
        let token = cancel.clone();
        let id = task_id.clone();
        let join = tokio::spawn(async move { poller.poll(&id, &token).await });
        PollHandle {
            task_id,
            cancel: cancel.clone(),
            join,
            _guard: cancel.drop_guard(),
        }
    }
}

/// Owner of a spawned poll. Dropping the handle stops the poll.
pub struct PollHandle {
    task_id: TaskId,
    cancel: CancellationToken,
    join: JoinHandle<Result<Value, PollError>>,
    _guard: DropGuard,
}

impl PollHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Stop polling. The pending [`PollHandle::wait`] resolves to
    /// [`PollError::Cancelled`] unless the task already finished.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Token shared with the poll, for tying other work to its lifetime.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> Result<Value, PollError> {
        let PollHandle {
            join,
            _guard: guard,
            ..
        } = self;
        let outcome = join.await;
        drop(guard);
        match outcome {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(PollError::Cancelled),
            Err(err) => Err(PollError::Aborted(err.to_string())),
        }
    }
}
