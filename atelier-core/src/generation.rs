//! Generation and post-processing request payloads.
//!
//! Field names follow the backend's wire format, which mixes camelCase
//! (video generation) with snake_case (everything else).

use crate::{DocumentId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompt used when a chained generation starts from a node with no prompt.
pub const DEFAULT_PROMPT: &str = "A cinematic shot";

pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-001";

/// Tunable parameters of a video generation, carried on graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub aspect_ratio: String,
    pub duration: u32,
    pub sample_count: u32,
    pub resolution: String,
    pub generate_audio: bool,
    pub enhance_prompt: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_VIDEO_MODEL.to_string(),
            aspect_ratio: "16:9".to_string(),
            duration: 8,
            sample_count: 1,
            resolution: "1080p".to_string(),
            generate_audio: true,
            enhance_prompt: true,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "model".into(),
            });
        }
        if !(1..=60).contains(&self.duration) {
            return Err(ValidationError::InvalidValue {
                field: "duration".into(),
                reason: "must be between 1 and 60 seconds".into(),
            });
        }
        if !(1..=4).contains(&self.sample_count) {
            return Err(ValidationError::InvalidValue {
                field: "sample_count".into(),
                reason: "must be between 1 and 4".into(),
            });
        }
        if !matches!(self.aspect_ratio.as_str(), "16:9" | "9:16" | "1:1") {
            return Err(ValidationError::InvalidValue {
                field: "aspect_ratio".into(),
                reason: format!("unsupported ratio {}", self.aspect_ratio),
            });
        }
        Ok(())
    }
}

/// Body of `POST /api/videos/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
    pub duration: u32,
    #[serde(rename = "sampleCount")]
    pub sample_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_gcs_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_frame_gcs_uri: Option<String>,
    #[serde(rename = "generateAudio")]
    pub generate_audio: bool,
    #[serde(rename = "enhancePrompt")]
    pub enhance_prompt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_project_id: Option<DocumentId>,
}

impl VideoGenerationRequest {
    pub fn new(prompt: impl Into<String>, params: &GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            model: params.model.clone(),
            aspect_ratio: params.aspect_ratio.clone(),
            duration: params.duration,
            sample_count: params.sample_count,
            image_gcs_uri: None,
            final_frame_gcs_uri: None,
            generate_audio: params.generate_audio,
            enhance_prompt: params.enhance_prompt,
            extend_duration: None,
            resolution: Some(params.resolution.clone()),
            creative_project_id: None,
        }
    }

    pub fn with_first_frame(mut self, gcs_uri: impl Into<String>) -> Self {
        self.image_gcs_uri = Some(gcs_uri.into());
        self
    }

    pub fn with_final_frame(mut self, gcs_uri: impl Into<String>) -> Self {
        self.final_frame_gcs_uri = Some(gcs_uri.into());
        self
    }

    pub fn with_project(mut self, project_id: Option<DocumentId>) -> Self {
        self.creative_project_id = project_id;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() && self.image_gcs_uri.is_none() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "prompt".into(),
            });
        }
        if self.final_frame_gcs_uri.is_some() && self.image_gcs_uri.is_none() {
            return Err(ValidationError::InvalidValue {
                field: "final_frame_gcs_uri".into(),
                reason: "a final frame requires a first frame".into(),
            });
        }
        Ok(())
    }
}

/// Body of `POST /api/images/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub aspect_ratio: String,
    pub sample_count: u32,
    pub image_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_project_id: Option<DocumentId>,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            negative_prompt: None,
            aspect_ratio: "1:1".to_string(),
            sample_count: 1,
            image_size: "1024x1024".to_string(),
            creative_project_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "prompt".into(),
            });
        }
        if !(1..=4).contains(&self.sample_count) {
            return Err(ValidationError::InvalidValue {
                field: "sample_count".into(),
                reason: "must be between 1 and 4".into(),
            });
        }
        Ok(())
    }
}

/// Multipart form of `POST /api/images/enrich`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEnrichmentRequest {
    pub sub_prompt: String,
    pub model: String,
    pub creative_project_id: Option<DocumentId>,
}

/// Multipart form of `POST /api/images/imitate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageImitationRequest {
    pub sub_prompt: String,
    pub model: String,
    pub sample_count: u32,
    pub image_size: String,
    pub creative_project_id: Option<DocumentId>,
}

impl Default for ImageImitationRequest {
    fn default() -> Self {
        Self {
            sub_prompt: String::new(),
            model: String::new(),
            sample_count: 1,
            image_size: "1K".to_string(),
            creative_project_id: None,
        }
    }
}

/// Body of `POST /api/videos/edit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub gcs_uri: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl ClipRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_time < 0.0 || self.end_time <= self.start_time {
            return Err(ValidationError::InvalidValue {
                field: "end_time".into(),
                reason: "clip must end after it starts".into(),
            });
        }
        Ok(())
    }
}

/// Body of `POST /api/videos/dub`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubRequest {
    pub gcs_uri: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpscaleResolution {
    #[default]
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "4k")]
    Uhd,
}

impl UpscaleResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpscaleResolution::FullHd => "1080p",
            UpscaleResolution::Uhd => "4k",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            UpscaleResolution::FullHd => UpscaleResolution::Uhd,
            UpscaleResolution::Uhd => UpscaleResolution::FullHd,
        }
    }
}

impl fmt::Display for UpscaleResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/videos/upscale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpscaleRequest {
    pub gcs_uri: String,
    pub resolution: UpscaleResolution,
}

/// Body of the share-to-group endpoints.
///
/// The video endpoint reads `video`, the image endpoint reads `item`; both
/// keys carry the same history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub video: serde_json::Value,
    pub item: serde_json::Value,
    pub group_id: DocumentId,
}

impl ShareRequest {
    pub fn new(row: serde_json::Value, group_id: impl Into<DocumentId>) -> Self {
        Self {
            video: row.clone(),
            item: row,
            group_id: group_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn video_request_uses_wire_names() {
        let req = VideoGenerationRequest::new(DEFAULT_PROMPT, &GenerationParams::default())
            .with_first_frame("gs://b/frame.png");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["prompt"], json!("A cinematic shot"));
        assert_eq!(value["model"], json!("veo-3.1-fast-generate-preview"));
        assert_eq!(value["aspectRatio"], json!("16:9"));
        assert_eq!(value["sampleCount"], json!(1));
        assert_eq!(value["generateAudio"], json!(true));
        assert_eq!(value["image_gcs_uri"], json!("gs://b/frame.png"));
        assert!(value.get("final_frame_gcs_uri").is_none());
        assert!(value.get("creative_project_id").is_none());
    }

    #[test]
    fn final_frame_needs_first_frame() {
        let req = VideoGenerationRequest::new("x", &GenerationParams::default())
            .with_final_frame("gs://b/last.png");
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn params_reject_out_of_range_duration() {
        let params = GenerationParams {
            duration: 0,
            ..GenerationParams::default()
        };
        assert!(params.validate().is_err());
        assert!(GenerationParams::default().validate().is_ok());
    }

    #[test]
    fn upscale_resolution_wire_values() {
        let req = UpscaleRequest {
            gcs_uri: "gs://v".into(),
            resolution: UpscaleResolution::Uhd,
        };
        assert_eq!(serde_json::to_value(&req).unwrap()["resolution"], json!("4k"));
    }

    #[test]
    fn clip_must_have_positive_length() {
        let clip = ClipRequest {
            gcs_uri: "gs://v".into(),
            start_time: 3.0,
            end_time: 3.0,
        };
        assert!(clip.validate().is_err());
    }
}
