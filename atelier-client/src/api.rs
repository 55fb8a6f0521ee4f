//! The backend seam used by the poller, stores and workflows.

use crate::ApiClientError;
use async_trait::async_trait;
use atelier_core::{
    DataUrl, HistoryPage, HistoryQuery, ImageEnrichmentRequest, ImageGenerationRequest,
    ImageImitationRequest, LocalMedia, SearchPage, SignedUrl, StoredObject, TaskEnvelope, TaskId,
    TaskSubmission, VideoGenerationRequest,
};

/// Where a frame capture reads its video from.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureSource {
    /// A clip picked from local disk, uploaded as `video_file`.
    File(LocalMedia),
    /// A hosted clip, sent as `video_url`.
    Url(String),
}

/// Multipart form of `POST /api/tools/capture_frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCaptureRequest {
    pub source: CaptureSource,
    /// Offset into the source clip, in seconds.
    pub timestamp: f64,
    /// A frame already grabbed client-side, uploaded as `frame_file`.
    pub frame: Option<DataUrl>,
}

/// Backend operations the client-side stores depend on.
///
/// [`crate::RestClient`] is the production implementation; tests use an
/// in-memory fake.
#[async_trait]
pub trait StudioApi: Send + Sync {
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskEnvelope, ApiClientError>;

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<TaskSubmission, ApiClientError>;

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<TaskSubmission, ApiClientError>;

    async fn enrich_image(
        &self,
        file: &LocalMedia,
        request: &ImageEnrichmentRequest,
    ) -> Result<TaskSubmission, ApiClientError>;

    async fn imitate_image(
        &self,
        file: &LocalMedia,
        request: &ImageImitationRequest,
    ) -> Result<TaskSubmission, ApiClientError>;

    async fn capture_frame(
        &self,
        request: &FrameCaptureRequest,
    ) -> Result<StoredObject, ApiClientError>;

    async fn sign_url(&self, gcs_uri: &str) -> Result<SignedUrl, ApiClientError>;

    async fn fetch_history(&self, query: &HistoryQuery) -> Result<HistoryPage, ApiClientError>;

    async fn search_history(
        &self,
        query: &HistoryQuery,
        text: &str,
    ) -> Result<SearchPage, ApiClientError>;
}
