//! Generated media payloads carried in task results.

use crate::MediaError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated video as referenced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    pub gcs_uri: String,
    #[serde(default)]
    pub signed_url: Option<String>,
}

impl VideoData {
    /// Signed URL, ignoring the empty string some endpoints send.
    pub fn playback_url(&self) -> Option<&str> {
        non_empty(self.signed_url.as_deref())
    }
}

/// A generated image as referenced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub gcs_uri: String,
    #[serde(default)]
    pub signed_url: Option<String>,
}

impl ImageData {
    pub fn display_url(&self) -> Option<&str> {
        non_empty(self.signed_url.as_deref())
    }
}

/// Structured content-safety rejection code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaiReason {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filtered: String,
}

impl fmt::Display for RaiReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.description)
    }
}

/// Result payload of a finished video generation task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoGenerationResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub videos: Vec<VideoData>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, rename = "revisedPrompt", alias = "revised_prompt")]
    pub revised_prompt: Option<String>,
    #[serde(default)]
    pub rai_reasons: Option<Vec<RaiReason>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl VideoGenerationResult {
    /// A missing payload decodes to an empty result.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MediaError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| MediaError::MalformedResult {
            reason: e.to_string(),
        })
    }

    /// First produced video, or the "no data returned" error.
    pub fn first_video(&self) -> Result<&VideoData, MediaError> {
        self.videos
            .first()
            .ok_or(MediaError::NoMediaReturned { kind: "video" })
    }

    /// Videos, or the "no data returned" error when the result carries
    /// neither media nor an explanation for its absence.
    pub fn ensure_videos(&self) -> Result<&[VideoData], MediaError> {
        if self.videos.is_empty() && self.rai_reasons().is_empty() && self.soft_failure().is_none()
        {
            return Err(MediaError::NoMediaReturned { kind: "video" });
        }
        Ok(&self.videos)
    }

    pub fn rai_reasons(&self) -> &[RaiReason] {
        self.rai_reasons.as_deref().unwrap_or(&[])
    }

    /// Error text embedded in an otherwise successful result.
    pub fn soft_failure(&self) -> Option<&str> {
        non_empty(self.error.as_deref())
    }
}

/// Result payload of a finished image generation, enrichment or imitation task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageGenerationResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, alias = "prompt", alias = "revisedPrompt")]
    pub revised_prompt: Option<String>,
    #[serde(default, alias = "model_used")]
    pub model: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub rai_reasons: Option<Vec<RaiReason>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ImageGenerationResult {
    /// A missing payload decodes to an empty result.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MediaError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| MediaError::MalformedResult {
            reason: e.to_string(),
        })
    }

    /// Images, or the "no data returned" error when the list is empty.
    ///
    /// A content-safety rejection with no images is not an error here; the
    /// caller shows the reasons instead.
    pub fn ensure_images(&self) -> Result<&[ImageData], MediaError> {
        if self.images.is_empty() && self.rai_reasons().is_empty() && self.soft_failure().is_none()
        {
            return Err(MediaError::NoMediaReturned { kind: "image" });
        }
        Ok(&self.images)
    }

    pub fn rai_reasons(&self) -> &[RaiReason] {
        self.rai_reasons.as_deref().unwrap_or(&[])
    }

    pub fn soft_failure(&self) -> Option<&str> {
        non_empty(self.error.as_deref())
    }
}

/// A generated video resolved to something a player can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableVideo {
    pub gcs_uri: String,
    pub url: String,
}

/// Response of `POST /api/tools/capture_frame` and `POST /api/images/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    #[serde(default)]
    pub gcs_uri: Option<String>,
    #[serde(default)]
    pub signed_url: Option<String>,
}

/// Response of `POST /api/tools/sign_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    #[serde(default)]
    pub signed_url: Option<String>,
}

/// Response of the clip and dub endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedVideo {
    #[serde(default)]
    pub message: String,
    pub processed_video_uri: String,
    #[serde(default)]
    pub signed_url: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_signed_url_is_not_playable() {
        let video = VideoData {
            gcs_uri: "gs://b/v.mp4".into(),
            signed_url: Some(String::new()),
        };
        assert!(video.playback_url().is_none());
    }

    #[test]
    fn empty_video_list_reports_no_data() {
        let result = VideoGenerationResult::from_value(json!({"videos": []})).unwrap();
        assert_eq!(
            result.first_video().unwrap_err().to_string(),
            "Generation succeeded but no video data returned."
        );
    }

    #[test]
    fn missing_payload_reports_no_data() {
        let video = VideoGenerationResult::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(
            video.ensure_videos().unwrap_err().to_string(),
            "Generation succeeded but no video data returned."
        );
        let image = ImageGenerationResult::from_value(serde_json::Value::Null).unwrap();
        assert!(matches!(
            image.ensure_images(),
            Err(MediaError::NoMediaReturned { kind: "image" })
        ));
    }

    #[test]
    fn embedded_error_is_not_missing_data() {
        let result = VideoGenerationResult::from_value(json!({
            "videos": [],
            "error": "Prompt rejected"
        }))
        .unwrap();
        assert!(result.ensure_videos().unwrap().is_empty());
        assert_eq!(result.soft_failure(), Some("Prompt rejected"));
        assert!(VideoGenerationResult::default().ensure_videos().is_err());
    }

    #[test]
    fn rai_rejection_is_soft() {
        let result = ImageGenerationResult::from_value(json!({
            "images": [],
            "rai_reasons": [{"code": "58061214", "category": "Child", "description": "blocked", "filtered": "true"}]
        }))
        .unwrap();
        assert!(result.ensure_images().unwrap().is_empty());
        assert_eq!(result.rai_reasons().len(), 1);
    }

    #[test]
    fn image_result_accepts_both_prompt_spellings() {
        let generated = ImageGenerationResult::from_value(json!({
            "images": [{"gcs_uri": "gs://a", "signed_url": "https://a"}],
            "prompt": "p1",
            "model_used": "imagen"
        }))
        .unwrap();
        assert_eq!(generated.revised_prompt.as_deref(), Some("p1"));
        assert_eq!(generated.model.as_deref(), Some("imagen"));

        let imitated = ImageGenerationResult::from_value(json!({
            "images": [{"gcs_uri": "gs://a"}],
            "revised_prompt": "p2",
            "model": "gemini"
        }))
        .unwrap();
        assert_eq!(imitated.revised_prompt.as_deref(), Some("p2"));
    }
}
