//! REST client for the studio backend.

use crate::api::{CaptureSource, FrameCaptureRequest, StudioApi};
use crate::{ApiClientError, ApiConfig};
use async_trait::async_trait;
use atelier_core::{
    AppConfig, AssetRequest, BulkMembersRequest, ClipRequest, ConsumptionReport, DateRange,
    DocumentId, DubRequest, Group, HistoryPage, HistoryQuery, HistoryRow, ImageEnrichmentRequest,
    ImageGenerationRequest, ImageImitationRequest, ImportEntry, ImportRequest, LocalMedia,
    MediaKind, MemberRequest, ModelList, NewCollection, NewPrompt, NotificationBanner,
    ProcessedVideo, Project, ProjectAsset, ProjectConfig, ProjectConfigEntry,
    ProjectConsumptionReport, PromptPage, SearchPage, ShareRequest, SharedItem, SignedUrl,
    StoredObject, TaskEnvelope, TaskId, TaskSubmission, UpscaleJob, UpscaleRequest,
    UserConsumption, UserProfile, VideoGenerationRequest,
};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use urlencoding::encode;

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ApiClientError::Config("base_url must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .default_headers(build_session_headers(config)?)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------------
    // Session & settings
    // ------------------------------------------------------------------------

    pub async fn current_user(&self) -> Result<UserProfile, ApiClientError> {
        self.get_json("/api/user/me", None).await
    }

    pub async fn app_config(&self) -> Result<AppConfig, ApiClientError> {
        self.get_json("/api/config", None).await
    }

    pub async fn video_models(&self) -> Result<ModelList, ApiClientError> {
        self.get_json("/api/models", None).await
    }

    pub async fn image_models(&self) -> Result<ModelList, ApiClientError> {
        self.get_json("/api/image-models", None).await
    }

    pub async fn enrichment_models(&self) -> Result<ModelList, ApiClientError> {
        self.get_json("/api/image-enrichment-models", None).await
    }

    pub async fn notification_banner(&self) -> Result<NotificationBanner, ApiClientError> {
        self.get_json("/api/notification-banner", None).await
    }

    /// Admin configuration document. Its shape is owned by the backend.
    pub async fn configurations(&self) -> Result<Value, ApiClientError> {
        self.get_json("/api/configurations", None).await
    }

    pub async fn save_configurations(&self, document: &Value) -> Result<(), ApiClientError> {
        self.send_unit(self.request(Method::POST, "/api/configurations").json(document))
            .await
    }

    // ------------------------------------------------------------------------
    // Media tools
    // ------------------------------------------------------------------------

    pub async fn upload_image(&self, file: &LocalMedia) -> Result<StoredObject, ApiClientError> {
        let form = Form::new().part("file", media_part(file)?);
        self.parse_response(self.request(Method::POST, "/api/images/upload").multipart(form))
            .await
    }

    pub async fn edit_video(&self, request: &ClipRequest) -> Result<ProcessedVideo, ApiClientError> {
        self.post_json("/api/videos/edit", request).await
    }

    pub async fn dub_video(&self, request: &DubRequest) -> Result<ProcessedVideo, ApiClientError> {
        self.post_json("/api/videos/dub", request).await
    }

    pub async fn upscale_video(&self, request: &UpscaleRequest) -> Result<Value, ApiClientError> {
        self.post_json("/api/videos/upscale", request).await
    }

    pub async fn upscale_jobs(&self) -> Result<Vec<UpscaleJob>, ApiClientError> {
        self.get_json("/api/videos/upscale/jobs", None).await
    }

    // ------------------------------------------------------------------------
    // Sharing
    // ------------------------------------------------------------------------

    pub async fn share_to_group(
        &self,
        kind: MediaKind,
        row: &HistoryRow,
        group_id: &str,
    ) -> Result<(), ApiClientError> {
        let path = match kind {
            MediaKind::Video => "/api/videos/share",
            MediaKind::Image => "/api/images/share",
        };
        let body = ShareRequest::new(row.to_value(), group_id);
        self.send_unit(self.request(Method::POST, path).json(&body))
            .await
    }

    pub async fn share_to_project(
        &self,
        row: &HistoryRow,
        project_id: &str,
    ) -> Result<(), ApiClientError> {
        let path = format!("/api/creative-projects/{}/assets", encode(project_id));
        let body = AssetRequest {
            asset: row.to_value(),
        };
        self.send_unit(self.request(Method::POST, &path).json(&body))
            .await
    }

    pub async fn group_items(&self, group_id: &str) -> Result<Vec<SharedItem>, ApiClientError> {
        let path = format!("/api/groups/{}/items", encode(group_id));
        self.get_json(&path, None).await
    }

    pub async fn delete_shared_item(&self, item_id: &str) -> Result<(), ApiClientError> {
        let path = format!("/api/shared-items/{}", encode(item_id));
        self.send_unit(self.request(Method::DELETE, &path)).await
    }

    // ------------------------------------------------------------------------
    // Creative projects
    // ------------------------------------------------------------------------

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiClientError> {
        self.get_json("/api/creative-projects", None).await
    }

    pub async fn create_project(&self, request: &NewCollection) -> Result<(), ApiClientError> {
        self.send_unit(self.request(Method::POST, "/api/creative-projects").json(request))
            .await
    }

    pub async fn add_project_member(
        &self,
        project_id: &str,
        email: &str,
    ) -> Result<(), ApiClientError> {
        self.add_member("creative-projects", project_id, email).await
    }

    pub async fn remove_project_member(
        &self,
        project_id: &str,
        email: &str,
    ) -> Result<(), ApiClientError> {
        self.remove_member("creative-projects", project_id, email)
            .await
    }

    pub async fn bulk_add_project_members(
        &self,
        project_id: &str,
        emails: &[String],
    ) -> Result<(), ApiClientError> {
        self.bulk_members(Method::POST, "creative-projects", project_id, emails)
            .await
    }

    pub async fn bulk_remove_project_members(
        &self,
        project_id: &str,
        emails: &[String],
    ) -> Result<(), ApiClientError> {
        self.bulk_members(Method::DELETE, "creative-projects", project_id, emails)
            .await
    }

    pub async fn import_projects(&self, data: Vec<ImportEntry>) -> Result<(), ApiClientError> {
        let body = ImportRequest { data };
        self.send_unit(self.request(Method::POST, "/api/creative-projects/import").json(&body))
            .await
    }

    pub async fn project_config(&self, project_id: &str) -> Result<ProjectConfig, ApiClientError> {
        let path = format!("/api/creative-projects/{}/config", encode(project_id));
        self.get_json(&path, None).await
    }

    pub async fn save_project_config(
        &self,
        project_id: &str,
        config: &ProjectConfig,
    ) -> Result<(), ApiClientError> {
        let path = format!("/api/creative-projects/{}/config", encode(project_id));
        self.send_unit(self.request(Method::POST, &path).json(config))
            .await
    }

    pub async fn save_project_configs(
        &self,
        entries: &[ProjectConfigEntry],
    ) -> Result<(), ApiClientError> {
        self.send_unit(
            self.request(Method::POST, "/api/creative-projects/config/bulk")
                .json(entries),
        )
        .await
    }

    pub async fn project_assets(
        &self,
        project_id: &str,
    ) -> Result<Vec<ProjectAsset>, ApiClientError> {
        let path = format!("/api/creative-projects/{}/assets", encode(project_id));
        self.get_json(&path, None).await
    }

    // ------------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------------

    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiClientError> {
        self.get_json("/api/groups", None).await
    }

    pub async fn create_group(&self, request: &NewCollection) -> Result<(), ApiClientError> {
        self.send_unit(self.request(Method::POST, "/api/groups").json(request))
            .await
    }

    pub async fn add_group_member(&self, group_id: &str, email: &str) -> Result<(), ApiClientError> {
        self.add_member("groups", group_id, email).await
    }

    pub async fn remove_group_member(
        &self,
        group_id: &str,
        email: &str,
    ) -> Result<(), ApiClientError> {
        self.remove_member("groups", group_id, email).await
    }

    pub async fn bulk_add_group_members(
        &self,
        group_id: &str,
        emails: &[String],
    ) -> Result<(), ApiClientError> {
        self.bulk_members(Method::POST, "groups", group_id, emails)
            .await
    }

    pub async fn bulk_remove_group_members(
        &self,
        group_id: &str,
        emails: &[String],
    ) -> Result<(), ApiClientError> {
        self.bulk_members(Method::DELETE, "groups", group_id, emails)
            .await
    }

    pub async fn import_groups(&self, data: Vec<ImportEntry>) -> Result<(), ApiClientError> {
        let body = ImportRequest { data };
        self.send_unit(self.request(Method::POST, "/api/groups/import").json(&body))
            .await
    }

    // ------------------------------------------------------------------------
    // Analytics
    // ------------------------------------------------------------------------

    pub async fn consumption(&self, range: &DateRange) -> Result<ConsumptionReport, ApiClientError> {
        let pairs = range.to_query_pairs();
        self.get_json("/api/analytics/consumption", Some(pairs.as_slice())).await
    }

    pub async fn consumption_by_project(
        &self,
        range: &DateRange,
    ) -> Result<ProjectConsumptionReport, ApiClientError> {
        let pairs = range.to_query_pairs();
        self.get_json("/api/analytics/consumption_by_project", Some(pairs.as_slice()))
            .await
    }

    pub async fn top_users(
        &self,
        range: &DateRange,
        top_x: u32,
    ) -> Result<Vec<UserConsumption>, ApiClientError> {
        let mut pairs = range.to_query_pairs();
        pairs.push(("top_x".into(), top_x.to_string()));
        self.get_json("/api/analytics/top_users", Some(pairs.as_slice())).await
    }

    // ------------------------------------------------------------------------
    // Prompt gallery
    // ------------------------------------------------------------------------

    pub async fn list_prompts(
        &self,
        tags: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<PromptPage, ApiClientError> {
        let mut pairs = vec![
            ("page".to_string(), page.max(1).to_string()),
            ("page_size".to_string(), page_size.max(1).to_string()),
        ];
        if let Some(tags) = tags.map(str::trim).filter(|t| !t.is_empty()) {
            pairs.push(("tags".into(), tags.to_string()));
        }
        self.get_json("/api/prompts", Some(pairs.as_slice())).await
    }

    pub async fn save_prompt(&self, prompt: &NewPrompt) -> Result<(), ApiClientError> {
        self.send_unit(self.request(Method::POST, "/api/prompts").json(prompt))
            .await
    }

    pub async fn delete_prompt(&self, prompt_id: &DocumentId) -> Result<(), ApiClientError> {
        let path = format!("/api/prompts/{}", encode(prompt_id));
        self.send_unit(self.request(Method::DELETE, &path)).await
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    async fn add_member(
        &self,
        collection: &str,
        id: &str,
        email: &str,
    ) -> Result<(), ApiClientError> {
        let path = format!("/api/{}/{}/members", collection, encode(id));
        let body = MemberRequest {
            email: email.trim().to_string(),
        };
        self.send_unit(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn remove_member(
        &self,
        collection: &str,
        id: &str,
        email: &str,
    ) -> Result<(), ApiClientError> {
        let path = format!(
            "/api/{}/{}/members/{}",
            collection,
            encode(id),
            encode(email.trim())
        );
        self.send_unit(self.request(Method::DELETE, &path)).await
    }

    async fn bulk_members(
        &self,
        method: Method,
        collection: &str,
        id: &str,
        emails: &[String],
    ) -> Result<(), ApiClientError> {
        let path = format!("/api/{}/{}/members/bulk", collection, encode(id));
        let body = BulkMembersRequest {
            emails: emails.to_vec(),
        };
        self.send_unit(self.request(method, &path).json(&body))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = method.as_str(), path, "backend request");
        self.client.request(method, url)
    }

    async fn get_json<T>(
        &self,
        path: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, path);
        if let Some(query) = query {
            request = request.query(query);
        }
        self.parse_response(request).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.parse_response(self.request(Method::POST, path).json(body))
            .await
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiClientError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(backend_error(status.as_u16(), &text))
        }
    }

    /// Send a request whose success body carries nothing the caller needs.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ApiClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await?;
        Err(backend_error(status.as_u16(), &text))
    }
}

#[async_trait]
impl StudioApi for RestClient {
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskEnvelope, ApiClientError> {
        let path = format!("/api/tasks/{}", encode(task_id.as_str()));
        self.get_json(&path, None).await
    }

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        self.post_json("/api/videos/generate", request).await
    }

    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        self.post_json("/api/images/generate", request).await
    }

    async fn enrich_image(
        &self,
        file: &LocalMedia,
        request: &ImageEnrichmentRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        let mut form = Form::new()
            .part("file", media_part(file)?)
            .text("sub_prompt", request.sub_prompt.clone())
            .text("model", request.model.clone());
        if let Some(project) = &request.creative_project_id {
            form = form.text("creative_project_id", project.clone());
        }
        self.parse_response(self.request(Method::POST, "/api/images/enrich").multipart(form))
            .await
    }

    async fn imitate_image(
        &self,
        file: &LocalMedia,
        request: &ImageImitationRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        let mut form = Form::new()
            .part("file", media_part(file)?)
            .text("sub_prompt", request.sub_prompt.clone())
            .text("model", request.model.clone())
            .text("sample_count", request.sample_count.to_string())
            .text("image_size", request.image_size.clone());
        if let Some(project) = &request.creative_project_id {
            form = form.text("creative_project_id", project.clone());
        }
        self.parse_response(self.request(Method::POST, "/api/images/imitate").multipart(form))
            .await
    }

    async fn capture_frame(
        &self,
        request: &FrameCaptureRequest,
    ) -> Result<StoredObject, ApiClientError> {
        let mut form = Form::new().text("timestamp", request.timestamp.to_string());
        form = match &request.source {
            CaptureSource::File(file) => form.part("video_file", media_part(file)?),
            CaptureSource::Url(url) => form.text("video_url", url.clone()),
        };
        if let Some(frame) = &request.frame {
            let part = Part::bytes(frame.bytes.clone())
                .file_name(format!("frame.{}", frame.extension()))
                .mime_str(&frame.mime_type)?;
            form = form.part("frame_file", part);
        }
        self.parse_response(
            self.request(Method::POST, "/api/tools/capture_frame")
                .multipart(form),
        )
        .await
    }

    async fn sign_url(&self, gcs_uri: &str) -> Result<SignedUrl, ApiClientError> {
        let body = serde_json::json!({ "gcs_uri": gcs_uri });
        self.post_json("/api/tools/sign_url", &body).await
    }

    async fn fetch_history(&self, query: &HistoryQuery) -> Result<HistoryPage, ApiClientError> {
        let pairs = query.to_query_pairs();
        self.get_json(query.tab.history_path(), Some(pairs.as_slice())).await
    }

    async fn search_history(
        &self,
        query: &HistoryQuery,
        text: &str,
    ) -> Result<SearchPage, ApiClientError> {
        self.post_json(query.tab.search_path(), &query.search_body(text))
            .await
    }
}

fn build_session_headers(config: &ApiConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(session) = config.session_cookie.as_deref().filter(|s| !s.is_empty()) {
        let value = format!("{}={}", config.session_cookie_name, session);
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

fn media_part(file: &LocalMedia) -> Result<Part, ApiClientError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)?)
}

/// Map an error response to [`ApiClientError::Backend`], keeping `detail`.
fn backend_error(status: u16, body: &str) -> ApiClientError {
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!("HTTP {}", status),
    };
    ApiClientError::Backend { status, detail }
}
