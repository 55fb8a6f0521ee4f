use atelier_client::{
    CaptureSource, ChainGenerator, GraphStore, SharedGraph, StoreError, StudioApi, TaskPoller,
    WorkflowError,
};
use atelier_core::{
    GraphEdge, GraphError, MediaError, PlayableVideo, Position, StoredObject, DEFAULT_PROMPT,
};
use atelier_test_utils::assertions::{assert_edges_consistent, assert_no_node_generating};
use atelier_test_utils::generators::{apply_graph_op, arb_graph_op};
use atelier_test_utils::{failed_status, fixtures, status, succeeded, succeeded_video, FakeStudioApi};
use proptest::prelude::*;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn generator(api: &Arc<FakeStudioApi>) -> ChainGenerator {
    let api: Arc<dyn StudioApi> = api.clone();
    let poller = TaskPoller::new(api.clone(), Duration::from_millis(2_000));
    ChainGenerator::new(api, SharedGraph::new(), poller)
}

#[tokio::test(start_paused = true)]
async fn chained_generation_fills_the_placeholder() {
    let api = Arc::new(FakeStudioApi::new());
    api.queue_task("t1");
    api.script_status("t1", vec![status("RUNNING"), succeeded_video("https://x")]);
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::new(10.0, 20.0), None)
        .unwrap();

    let created = chain
        .trigger_generation(source, None, 2.5, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let graph = chain.graph().snapshot().unwrap();
    let node = graph.node(created).unwrap();
    assert_eq!(node.data.video_url, "https://x");
    assert!(!node.data.is_generating);
    assert_eq!(node.data.start_time, Some(2.5));
    assert!(node.data.prompt.is_empty());
    assert_eq!(node.position, Position::new(460.0, 20.0));
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edges()[0].id, GraphEdge::edge_id(source, created));

    let captures = api.captures();
    assert_eq!(captures.len(), 1);
    assert_eq!(
        captures[0].source,
        CaptureSource::Url("https://cdn.example/a.mp4".into())
    );
    assert_eq!(captures[0].timestamp, 2.5);

    let requests = api.video_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, DEFAULT_PROMPT);
    assert_eq!(requests[0].image_gcs_uri.as_deref(), Some("gs://frames/frame.png"));
}

#[tokio::test(start_paused = true)]
async fn local_source_uploads_file_and_frame() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("task-1", vec![succeeded_video("https://x")]);
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_video_node(fixtures::sample_clip(), Position::default())
        .unwrap();
    chain.graph().update_node_prompt(source, "the camera pans left").unwrap();

    chain
        .trigger_generation(
            source,
            Some(fixtures::frame_data_url()),
            1.0,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let captures = api.captures();
    assert!(matches!(captures[0].source, CaptureSource::File(_)));
    let frame = captures[0].frame.as_ref().unwrap();
    assert_eq!(frame.mime_type, "image/png");
    assert_eq!(api.video_requests()[0].prompt, "the camera pans left");
}

#[tokio::test(start_paused = true)]
async fn missing_source_media_rolls_back() {
    let api = Arc::new(FakeStudioApi::new());
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("", Position::default(), Some("a prompt"))
        .unwrap();

    let err = chain
        .trigger_generation(source, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Graph(GraphError::NoSourceMedia)));
    assert_eq!(err.to_string(), "No source media available.");
    let graph = chain.graph().snapshot().unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert!(graph.edges().is_empty());
    assert!(api.captures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn capture_without_gcs_uri_rolls_back() {
    let api = Arc::new(FakeStudioApi::new());
    api.set_capture_response(StoredObject {
        gcs_uri: None,
        signed_url: None,
    });
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();

    let err = chain
        .trigger_generation(source, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to capture frame: No GCS URI returned."
    );
    assert_eq!(chain.graph().snapshot().unwrap().nodes().len(), 1);
    assert!(api.video_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn task_failure_rolls_back_with_server_text() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("task-1", vec![status("RUNNING"), failed_status("quota exceeded")]);
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();

    let err = chain
        .trigger_generation(source, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "quota exceeded");
    let graph = chain.graph().snapshot().unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert!(graph.edges().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsigned_result_is_signed_on_demand() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status(
        "task-1",
        vec![succeeded(json!({"videos": [{"gcs_uri": "gs://x"}]}))],
    );
    api.set_signed_url("gs://x", "https://signed.example/x");
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();

    let created = chain
        .trigger_generation(source, None, 0.0, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(api.sign_calls(), 1);
    let node = chain.graph().node(created).unwrap().unwrap();
    assert_eq!(node.data.video_url, "https://signed.example/x");
}

#[tokio::test(start_paused = true)]
async fn failed_signing_reports_missing_playback_url() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status(
        "task-1",
        vec![succeeded(json!({"videos": [{"gcs_uri": "gs://x", "signed_url": ""}]}))],
    );
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();

    let err = chain
        .trigger_generation(source, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Media(MediaError::NoPlaybackUrl)));
    assert_eq!(chain.graph().snapshot().unwrap().nodes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_generation_rolls_back() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status("task-1", vec![status("RUNNING")]);
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();
    let cancel = CancellationToken::new();

    let task = {
        let chain = chain.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { chain.trigger_generation(source, None, 0.0, &cancel).await })
    };
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(chain.graph().snapshot().unwrap().nodes().len(), 2);

    cancel.cancel();
    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(chain.graph().snapshot().unwrap().nodes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deleting_the_placeholder_mid_flight_drops_the_clip() {
    let api = Arc::new(FakeStudioApi::new());
    api.script_status(
        "task-1",
        vec![status("RUNNING"), status("RUNNING"), succeeded_video("https://x")],
    );
    let chain = generator(&api);
    let source = chain
        .graph()
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();

    let task = {
        let chain = chain.clone();
        tokio::spawn(async move {
            chain
                .trigger_generation(source, None, 0.0, &CancellationToken::new())
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    let graph = chain.graph().snapshot().unwrap();
    let placeholder = graph.children(source).next().unwrap();
    chain.graph().delete_node(placeholder).unwrap();

    assert_eq!(task.await.unwrap().unwrap(), None);
    let graph = chain.graph().snapshot().unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert!(graph.edges().is_empty());
    assert_edges_consistent(&graph);
}

#[test]
fn generating_node_cannot_be_chained() {
    let store = GraphStore::new();
    let source = store
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();
    let (placeholder, _, _undo) = store.begin_generation(source, None).unwrap();

    let err = store.begin_generation(placeholder, None).unwrap_err();
    assert_eq!(err, StoreError::Graph(GraphError::StillGenerating(placeholder)));
}

#[test]
fn undo_only_removes_its_own_delta() {
    let store = GraphStore::new();
    let source = store
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();
    let (first, _, first_undo) = store.begin_generation(source, None).unwrap();
    let (second, _, _second_undo) = store.begin_generation(source, None).unwrap();

    first_undo.run(&store).unwrap();

    let graph = store.snapshot().unwrap();
    assert!(!graph.contains(first));
    assert!(graph.contains(second));
    assert_eq!(graph.edges().len(), 1);
    assert_edges_consistent(&graph);
}

#[test]
fn undo_after_user_deleted_placeholder_is_harmless() {
    let store = GraphStore::new();
    let source = store
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();
    let (placeholder, _, undo) = store.begin_generation(source, None).unwrap();
    store.delete_node(placeholder).unwrap();

    undo.run(&store).unwrap();
    assert_eq!(store.snapshot().unwrap().nodes().len(), 1);
}

#[test]
fn connect_and_delete_keep_edges_consistent() {
    let store = GraphStore::new();
    let a = store
        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
        .unwrap();
    let b = store
        .add_video_node(fixtures::sample_clip(), Position::new(450.0, 0.0))
        .unwrap();

    assert_eq!(store.connect(a, b).unwrap(), GraphEdge::edge_id(a, b));
    assert!(store.connect(a, b).is_err());
    assert!(store.connect(a, a).is_err());

    store.delete_node(b).unwrap();
    let graph = store.snapshot().unwrap();
    assert!(graph.edges().is_empty());

    store.reset().unwrap();
    assert!(store.snapshot().unwrap().is_empty());
}

#[test]
fn complete_generation_clears_local_file() {
    let store = GraphStore::new();
    let source = store
        .add_video_node(fixtures::sample_clip(), Position::default())
        .unwrap();
    let (placeholder, _, _undo) = store.begin_generation(source, None).unwrap();
    let committed = store
        .complete_generation(
            placeholder,
            &PlayableVideo {
                gcs_uri: "gs://x".into(),
                url: "https://x".into(),
            },
            3.0,
        )
        .unwrap();
    assert!(committed);

    let graph = store.snapshot().unwrap();
    assert_no_node_generating(&graph);
    let node = graph.node(placeholder).unwrap();
    assert!(node.data.source_file.is_none());
    assert_eq!(node.data.remote_url(), Some("https://x"));
}

#[tokio::test]
async fn video_file_is_read_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    file.write_all(b"not really a video").unwrap();
    let store = GraphStore::new();

    let id = store
        .add_video_file(file.path(), Position::default())
        .await
        .unwrap();

    let node = store.node(id).unwrap().unwrap();
    assert!(node.data.video_url.starts_with("data:video/mp4;base64,"));
    assert!(node.data.source_file.is_some());
}

#[tokio::test]
async fn missing_video_file_is_an_io_error() {
    let store = GraphStore::new();
    let err = store
        .add_video_file(std::path::Path::new("/nonexistent/clip.mp4"), Position::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Io { .. }));
}

#[derive(Debug, Clone)]
enum StoreOp {
    Add,
    Delete(usize),
    Connect(usize, usize),
    Generate(usize),
    Rollback,
}

fn arb_store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        3 => Just(StoreOp::Add),
        1 => any::<usize>().prop_map(StoreOp::Delete),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| StoreOp::Connect(a, b)),
        2 => any::<usize>().prop_map(StoreOp::Generate),
        2 => Just(StoreOp::Rollback),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn graph_ops_keep_edges_consistent(ops in prop::collection::vec(arb_graph_op(), 0..40)) {
        let mut graph = atelier_core::NodeGraph::new();
        for op in &ops {
            apply_graph_op(&mut graph, op);
            assert_edges_consistent(&graph);
        }
    }

    #[test]
    fn store_edits_and_rollbacks_keep_edges_consistent(
        ops in prop::collection::vec(arb_store_op(), 0..40),
    ) {
        let store = GraphStore::new();
        let mut undos = Vec::new();
        for op in ops {
            let ids: Vec<_> = store.snapshot().unwrap().nodes().iter().map(|n| n.id).collect();
            match op {
                StoreOp::Add => {
                    store
                        .add_remote_video_node("https://cdn.example/a.mp4", Position::default(), None)
                        .unwrap();
                }
                StoreOp::Delete(i) if !ids.is_empty() => {
                    store.delete_node(ids[i % ids.len()]).unwrap();
                }
                StoreOp::Connect(a, b) if !ids.is_empty() => {
                    let _ = store.connect(ids[a % ids.len()], ids[b % ids.len()]);
                }
                StoreOp::Generate(i) if !ids.is_empty() => {
                    if let Ok((_, _, undo)) = store.begin_generation(ids[i % ids.len()], None) {
                        undos.push(undo);
                    }
                }
                StoreOp::Rollback => {
                    if let Some(undo) = undos.pop() {
                        undo.run(&store).unwrap();
                    }
                }
                _ => {}
            }
            assert_edges_consistent(&store.snapshot().unwrap());
        }
    }
}
