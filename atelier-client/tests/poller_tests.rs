use atelier_client::{PollError, StudioApi, TaskPoller};
use atelier_core::{MediaError, TaskId};
use atelier_test_utils::generators::arb_non_terminal_status;
use atelier_test_utils::{failed_status, status, succeeded, succeeded_video, FakeStudioApi};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn poller(api: &Arc<FakeStudioApi>) -> TaskPoller {
    let api: Arc<dyn StudioApi> = api.clone();
    TaskPoller::new(api, Duration::from_millis(2_000))
}

#[tokio::test(start_paused = true)]
async fn resolves_after_running() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status(
        "t1",
        vec![status("RUNNING"), status("processing"), succeeded_video("https://x")],
    );

    let result = poller(&api)
        .poll_video_result(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.videos.len(), 1);
    assert_eq!(result.videos[0].playback_url(), Some("https://x"));
    assert_eq!(api.status_calls("t1"), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_text_is_verbatim() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![status("RUNNING"), failed_status("quota exceeded")]);

    let err = poller(&api)
        .poll(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::TaskFailed(_)));
    assert_eq!(err.to_string(), "quota exceeded");
}

#[tokio::test(start_paused = true)]
async fn failure_without_text_uses_fallback() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![failed_status("  ")]);

    let err = poller(&api)
        .poll(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Task failed");
}

#[tokio::test(start_paused = true)]
async fn transport_error_rejects_without_retry() {
    let api = Arc::new(FakeStudioApi::new());
    api.fail_status("t1", 500, "Internal Server Error");

    let err = poller(&api)
        .poll(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::Status(_)));
    assert_eq!(err.to_string(), "Failed to get task status.");
    assert_eq!(api.status_calls("t1"), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_success_is_no_data() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![succeeded(json!({"message": "ok", "videos": []}))]);

    let err = poller(&api)
        .poll_video_result(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PollError::Media(MediaError::NoMediaReturned { kind: "video" })
    ));
    assert_eq!(
        err.to_string(),
        "Generation succeeded but no video data returned."
    );
}

#[tokio::test(start_paused = true)]
async fn success_without_payload_is_no_data() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![status("SUCCESS")]);
    api.script_status("t2", vec![status("RUNNING"), status("SUCCESS")]);

    let err = poller(&api)
        .poll_video_result(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Generation succeeded but no video data returned."
    );

    let err = poller(&api)
        .poll_image_result(&TaskId::new("t2"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PollError::Media(MediaError::NoMediaReturned { kind: "image" })
    ));
}

#[tokio::test(start_paused = true)]
async fn rai_rejection_is_a_soft_success() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status(
        "t1",
        vec![succeeded(json!({
            "images": [],
            "rai_reasons": [{"code": "58061214", "category": "Child", "description": "blocked", "filtered": "true"}]
        }))],
    );

    let result = poller(&api)
        .poll_image_result(&TaskId::new("t1"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.images.is_empty());
    assert_eq!(result.rai_reasons().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_running_poll() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![status("RUNNING")]);

    let handle = poller(&api).spawn(TaskId::new("t1"));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!handle.is_finished());

    handle.stop();
    assert!(handle.is_stopped());
    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, PollError::Cancelled));
    assert!(api.status_calls("t1") >= 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_polling() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![status("RUNNING")]);

    let handle = poller(&api).spawn(TaskId::new("t1"));
    tokio::time::sleep(Duration::from_secs(5)).await;
    drop(handle);
    tokio::task::yield_now().await;
    let calls = api.status_calls("t1");

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.status_calls("t1"), calls);
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_stops_before_first_request() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("t1", vec![status("RUNNING")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = poller(&api)
        .poll(&TaskId::new("t1"), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::Cancelled));
    assert_eq!(api.status_calls("t1"), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn non_terminal_statuses_never_settle(raw in arb_non_terminal_status()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        runtime.block_on(async {
            let api = Arc::new(FakeStudioApi::new());
            api.script_status("t1", vec![status(&raw)]);
            let poll = poller(&api);
            let outcome = tokio::time::timeout(
                Duration::from_secs(60),
                poll.poll(&TaskId::new("t1"), &CancellationToken::new()),
            )
            .await;
            assert!(outcome.is_err(), "status {raw:?} settled the poll");
            assert!(api.status_calls("t1") > 1);
        });
    }
}
