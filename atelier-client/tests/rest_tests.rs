use atelier_client::{
    ApiClientError, ApiConfig, GenerationWorkflow, PollError, RestClient, StudioApi, TaskPoller,
    WorkflowError,
};
use atelier_core::{
    DateRange, GenerationParams, HistoryFilters, HistoryQuery, HistoryTab, NewPrompt, TaskId,
    TaskStatus, VideoGenerationRequest, DEFAULT_PROMPT,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RestClient {
    RestClient::new(&ApiConfig::new(server.uri())).unwrap()
}

fn workflow(server: &MockServer) -> GenerationWorkflow {
    let api: Arc<dyn StudioApi> = Arc::new(client(server));
    let poller = TaskPoller::new(api.clone(), Duration::from_millis(20));
    GenerationWorkflow::new(api, poller.clone(), poller)
}

#[tokio::test]
async fn generate_video_scenario_yields_one_playable_video() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/videos/generate"))
        .and(body_partial_json(json!({
            "prompt": "A cinematic shot",
            "aspectRatio": "16:9",
            "duration": 8,
            "sampleCount": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "result": {"videos": [{"gcs_uri": "gs://x", "signed_url": "https://x"}]}
        })))
        .mount(&server)
        .await;

    let request = VideoGenerationRequest::new(DEFAULT_PROMPT, &GenerationParams::default());
    let outcome = workflow(&server)
        .generate_video(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.videos.len(), 1);
    assert_eq!(outcome.videos[0].url, "https://x");
    assert!(outcome.rai_reasons.is_empty());
}

#[tokio::test]
async fn task_failure_text_reaches_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/videos/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t2"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "FAILURE", "error": "quota exceeded"})),
        )
        .mount(&server)
        .await;

    let request = VideoGenerationRequest::new("a fox", &GenerationParams::default());
    let err = workflow(&server)
        .generate_video(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Poll(PollError::TaskFailed(_))));
    assert_eq!(err.to_string(), "quota exceeded");
}

#[tokio::test]
async fn status_endpoint_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/t3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let api: Arc<dyn StudioApi> = Arc::new(client(&server));
    let err = TaskPoller::new(api, Duration::from_millis(10))
        .poll(&TaskId::new("t3"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to get task status.");
}

#[tokio::test]
async fn image_statuses_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/img"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed", "result": {}})))
        .mount(&server)
        .await;

    let envelope = client(&server)
        .task_status(&TaskId::new("img"))
        .await
        .unwrap();
    assert_eq!(envelope.status, TaskStatus::Succeeded);
}

#[tokio::test]
async fn backend_detail_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/prompts"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"detail": "Admins only."})),
        )
        .mount(&server)
        .await;

    let prompt = NewPrompt::new("a quiet harbor", "sea, dawn").unwrap();
    let err = client(&server).save_prompt(&prompt).await.unwrap_err();

    assert!(matches!(err, ApiClientError::Backend { status: 403, .. }));
    assert_eq!(err.to_string(), "Admins only.");
}

#[tokio::test]
async fn session_cookie_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/me"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authenticated": true,
            "email": "ada@example.com",
            "name": "Ada",
            "role": "APP_ADMIN"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ApiConfig::new(server.uri());
    config.session_cookie = Some("abc".into());
    let user = RestClient::new(&config).unwrap().current_user().await.unwrap();

    assert!(user.is_admin());
}

#[tokio::test]
async fn history_query_carries_filters_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/videos/history"))
        .and(query_param("status", "SUCCESS"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [{"prompt": "p", "output_video_gcs_paths": "[\"gs://a.mp4\"]"}],
            "total": 11
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filters = HistoryFilters {
        only_success: true,
        ..HistoryFilters::default()
    };
    let query = HistoryQuery::new(HistoryTab::Video, &filters, 2, 10);
    let page = client(&server).fetch_history(&query).await.unwrap();

    assert_eq!(page.total, 11);
    assert_eq!(page.rows[0].primary_gcs_uri().as_deref(), Some("gs://a.mp4"));
}

#[tokio::test]
async fn similarity_search_posts_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/images/search_similarity_image"))
        .and(body_partial_json(json!({"text": "red car", "page": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": [], "total_rows": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let query = HistoryQuery::first_page(HistoryTab::Image);
    let page = client(&server).search_history(&query, "red car").await.unwrap();
    assert_eq!(page.total_rows, 0);
}

#[tokio::test]
async fn consumption_uses_date_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/consumption"))
        .and(query_param("start_date", "2025-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": {"total_cost": 3.0, "total_video_cost": 2.0, "total_image_cost": 1.0},
            "daily_consumption": [],
            "top_users": [],
            "model_distribution": {"video": [], "image": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let range = DateRange {
        start_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1),
        end_date: None,
    };
    let report = client(&server).consumption(&range).await.unwrap();
    assert_eq!(report.summary.total_cost, 3.0);
}

#[tokio::test]
async fn frame_capture_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tools/capture_frame"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"gcs_uri": "gs://frames/f.png"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stored = client(&server)
        .capture_frame(&atelier_client::FrameCaptureRequest {
            source: atelier_client::CaptureSource::Url("https://cdn.example/a.mp4".into()),
            timestamp: 1.5,
            frame: None,
        })
        .await
        .unwrap();
    assert_eq!(stored.gcs_uri.as_deref(), Some("gs://frames/f.png"));

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn member_email_is_a_single_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/groups/team%20a/members/ops%23lead%40example.com"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .remove_group_member("team a", " ops#lead@example.com ")
        .await
        .unwrap();
}
