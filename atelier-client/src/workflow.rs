//! Submit-and-poll flows behind the generation forms.

use crate::api::StudioApi;
use crate::{TaskPoller, WorkflowError};
use atelier_core::{
    ImageData, ImageEnrichmentRequest, ImageGenerationRequest, ImageGenerationResult,
    ImageImitationRequest, LocalMedia, PlayableVideo, RaiReason, TaskSubmission, VideoData,
    VideoGenerationRequest, VideoGenerationResult,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What the video form shows once a generation settles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoOutcome {
    pub videos: Vec<PlayableVideo>,
    pub revised_prompt: Option<String>,
    pub rai_reasons: Vec<RaiReason>,
    /// Error text embedded in a succeeded task.
    pub error: Option<String>,
}

impl VideoOutcome {
    pub fn is_blocked(&self) -> bool {
        self.videos.is_empty() && !self.rai_reasons.is_empty()
    }
}

/// What the image forms show once a generation settles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageOutcome {
    pub images: Vec<ImageData>,
    pub revised_prompt: Option<String>,
    pub model: Option<String>,
    pub rai_reasons: Vec<RaiReason>,
    pub error: Option<String>,
}

impl ImageOutcome {
    pub fn is_blocked(&self) -> bool {
        self.images.is_empty() && !self.rai_reasons.is_empty()
    }
}

/// Resolve a video to a playable URL, asking the backend to sign it when the
/// result carried none. A failed signing call yields `None`.
pub async fn resolve_playable(api: &dyn StudioApi, video: &VideoData) -> Option<PlayableVideo> {
    if let Some(url) = video.playback_url() {
        return Some(PlayableVideo {
            gcs_uri: video.gcs_uri.clone(),
            url: url.to_string(),
        });
    }
    let signed = match api.sign_url(&video.gcs_uri).await {
        Ok(signed) => signed,
        Err(err) => {
            tracing::warn!(gcs_uri = %video.gcs_uri, error = %err, "signing failed");
            return None;
        }
    };
    signed
        .signed_url
        .filter(|url| !url.trim().is_empty())
        .map(|url| PlayableVideo {
            gcs_uri: video.gcs_uri.clone(),
            url,
        })
}

#[derive(Clone)]
pub struct GenerationWorkflow {
    api: Arc<dyn StudioApi>,
    video_poller: TaskPoller,
    image_poller: TaskPoller,
}

impl GenerationWorkflow {
    pub fn new(api: Arc<dyn StudioApi>, video_poller: TaskPoller, image_poller: TaskPoller) -> Self {
        Self {
            api,
            video_poller,
            image_poller,
        }
    }

    pub async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<VideoOutcome, WorkflowError> {
        request.validate()?;
        let submission = self.api.generate_video(request).await?;
        tracing::info!(task_id = %submission.task_id, model = %request.model, "video generation submitted");
        let result = self
            .video_poller
            .poll_video_result(&submission.task_id, cancel)
            .await?;
        self.video_outcome(result).await
    }

    async fn video_outcome(&self, result: VideoGenerationResult) -> Result<VideoOutcome, WorkflowError> {
        let mut videos = Vec::with_capacity(result.videos.len());
        for video in &result.videos {
            match resolve_playable(self.api.as_ref(), video).await {
                Some(playable) => videos.push(playable),
                None => tracing::warn!(gcs_uri = %video.gcs_uri, "dropping video without playback url"),
            }
        }
        if videos.is_empty() && !result.videos.is_empty() {
            return Err(atelier_core::MediaError::NoPlaybackUrl.into());
        }
        Ok(VideoOutcome {
            videos,
            rai_reasons: result.rai_reasons().to_vec(),
            error: result.soft_failure().map(str::to_string),
            revised_prompt: result.revised_prompt,
        })
    }

    pub async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<ImageOutcome, WorkflowError> {
        request.validate()?;
        let submission = self.api.generate_image(request).await?;
        self.await_image(submission, cancel).await
    }

    pub async fn enrich_image(
        &self,
        file: &LocalMedia,
        request: &ImageEnrichmentRequest,
        cancel: &CancellationToken,
    ) -> Result<ImageOutcome, WorkflowError> {
        let submission = self.api.enrich_image(file, request).await?;
        self.await_image(submission, cancel).await
    }

    pub async fn imitate_image(
        &self,
        file: &LocalMedia,
        request: &ImageImitationRequest,
        cancel: &CancellationToken,
    ) -> Result<ImageOutcome, WorkflowError> {
        let submission = self.api.imitate_image(file, request).await?;
        self.await_image(submission, cancel).await
    }

    async fn await_image(
        &self,
        submission: TaskSubmission,
        cancel: &CancellationToken,
    ) -> Result<ImageOutcome, WorkflowError> {
        tracing::info!(task_id = %submission.task_id, "image task submitted");
        let result: ImageGenerationResult = self
            .image_poller
            .poll_image_result(&submission.task_id, cancel)
            .await?;
        Ok(ImageOutcome {
            rai_reasons: result.rai_reasons().to_vec(),
            error: result.soft_failure().map(str::to_string),
            images: result.images,
            revised_prompt: result.revised_prompt,
            model: result.model,
        })
    }
}
