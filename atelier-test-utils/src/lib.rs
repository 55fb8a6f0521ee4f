//! Atelier Test Utilities
//!
//! Shared test infrastructure for the Atelier workspace:
//! - A scripted in-memory [`StudioApi`] backend
//! - Proptest generators for statuses, filters and graph edits
//! - Fixtures for nodes, task envelopes and history pages
//! - Assertions for graph invariants

pub use atelier_client::{ApiClientError, CaptureSource, FrameCaptureRequest, StudioApi};
pub use atelier_core::{
    GraphNode, HistoryFilters, HistoryPage, HistoryQuery, HistoryRow, HistoryTab, LocalMedia,
    NodeData, NodeGraph, NodeId, Position, SearchPage, SignedUrl, StoredObject, TaskEnvelope,
    TaskId, TaskStatus, TaskSubmission, VideoGenerationRequest,
};

use async_trait::async_trait;
use atelier_core::{ImageEnrichmentRequest, ImageGenerationRequest, ImageImitationRequest};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

// ============================================================================
// TASK ENVELOPES
// ============================================================================

/// A status response with no payload, e.g. `status("RUNNING")`.
pub fn status(raw: &str) -> TaskEnvelope {
    TaskEnvelope {
        status: TaskStatus::from_wire(raw),
        result: None,
        error: None,
    }
}

pub fn failed_status(message: &str) -> TaskEnvelope {
    TaskEnvelope {
        status: TaskStatus::Failed,
        result: None,
        error: Some(message.to_string()),
    }
}

pub fn succeeded(result: Value) -> TaskEnvelope {
    TaskEnvelope {
        status: TaskStatus::Succeeded,
        result: Some(result),
        error: None,
    }
}

/// A finished video task with one signed clip at `gs://x`.
pub fn succeeded_video(url: &str) -> TaskEnvelope {
    succeeded(json!({
        "message": "ok",
        "videos": [{"gcs_uri": "gs://x", "signed_url": url}],
        "duration": 8.0
    }))
}

pub fn succeeded_image(url: &str) -> TaskEnvelope {
    succeeded(json!({
        "message": "ok",
        "images": [{"gcs_uri": "gs://img", "signed_url": url}],
        "revisedPrompt": "a revised prompt"
    }))
}

// ============================================================================
// FAKE BACKEND
// ============================================================================

#[derive(Default)]
struct FakeState {
    statuses: HashMap<TaskId, VecDeque<TaskEnvelope>>,
    status_errors: HashMap<TaskId, (u16, String)>,
    status_calls: HashMap<TaskId, usize>,
    next_tasks: VecDeque<TaskId>,
    submitted_tasks: usize,
    video_requests: Vec<VideoGenerationRequest>,
    image_requests: usize,
    captures: Vec<FrameCaptureRequest>,
    capture_response: Option<StoredObject>,
    capture_error: Option<(u16, String)>,
    signed: HashMap<String, String>,
    sign_calls: usize,
    history: HashMap<HistoryTab, HistoryPage>,
    history_calls: usize,
    search_calls: usize,
    history_gate: Option<Arc<Semaphore>>,
}

/// Scripted in-memory backend.
///
/// Status scripts are consumed one entry per call; the last entry repeats
/// forever, so `script_status(id, vec![status("RUNNING")])` never terminates.
pub struct FakeStudioApi {
    state: Mutex<FakeState>,
}

impl Default for FakeStudioApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStudioApi {
    pub fn new() -> Self {
        let state = FakeState {
            capture_response: Some(StoredObject {
                gcs_uri: Some("gs://frames/frame.png".into()),
                signed_url: None,
            }),
            ..FakeState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn script_status(&self, task_id: &str, envelopes: Vec<TaskEnvelope>) {
        self.lock()
            .statuses
            .insert(TaskId::new(task_id), envelopes.into());
    }

    /// Make every status request for `task_id` fail with a backend error.
    pub fn fail_status(&self, task_id: &str, status: u16, detail: &str) {
        self.lock()
            .status_errors
            .insert(TaskId::new(task_id), (status, detail.to_string()));
    }

    pub fn status_calls(&self, task_id: &str) -> usize {
        self.lock()
            .status_calls
            .get(&TaskId::new(task_id))
            .copied()
            .unwrap_or(0)
    }

    /// Id handed out by the next submission. Unqueued submissions get
    /// `task-{n}`.
    pub fn queue_task(&self, task_id: &str) {
        self.lock().next_tasks.push_back(TaskId::new(task_id));
    }

    pub fn video_requests(&self) -> Vec<VideoGenerationRequest> {
        self.lock().video_requests.clone()
    }

    pub fn image_requests(&self) -> usize {
        self.lock().image_requests
    }

    pub fn set_capture_response(&self, response: StoredObject) {
        self.lock().capture_response = Some(response);
    }

    pub fn fail_capture(&self, status: u16, detail: &str) {
        self.lock().capture_error = Some((status, detail.to_string()));
    }

    pub fn captures(&self) -> Vec<FrameCaptureRequest> {
        self.lock().captures.clone()
    }

    pub fn set_signed_url(&self, gcs_uri: &str, url: &str) {
        self.lock()
            .signed
            .insert(gcs_uri.to_string(), url.to_string());
    }

    pub fn sign_calls(&self) -> usize {
        self.lock().sign_calls
    }

    pub fn set_history(&self, tab: HistoryTab, page: HistoryPage) {
        self.lock().history.insert(tab, page);
    }

    /// Park history requests until [`FakeStudioApi::release_history`].
    ///
    /// A parked request answers with the page scripted when it was made.
    pub fn hold_history(&self) {
        self.lock().history_gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_history(&self) {
        if let Some(gate) = self.lock().history_gate.take() {
            gate.close();
        }
    }

    pub fn history_calls(&self) -> usize {
        self.lock().history_calls
    }

    pub fn search_calls(&self) -> usize {
        self.lock().search_calls
    }

    fn submit(&self) -> TaskSubmission {
        let mut state = self.lock();
        state.submitted_tasks += 1;
        let fallback = TaskId::new(format!("task-{}", state.submitted_tasks));
        TaskSubmission {
            task_id: state.next_tasks.pop_front().unwrap_or(fallback),
        }
    }
}

fn backend(status: u16, detail: &str) -> ApiClientError {
    ApiClientError::Backend {
        status,
        detail: detail.to_string(),
    }
}

#[async_trait]
impl StudioApi for FakeStudioApi {
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskEnvelope, ApiClientError> {
        let mut state = self.lock();
        *state.status_calls.entry(task_id.clone()).or_default() += 1;
        if let Some((status, detail)) = state.status_errors.get(task_id) {
            return Err(backend(*status, detail));
        }
        let script = state
            .statuses
            .get_mut(task_id)
            .ok_or_else(|| backend(404, "Task not found"))?;
        let envelope = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        envelope.ok_or_else(|| backend(404, "Task not found"))
    }

    async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        self.lock().video_requests.push(request.clone());
        Ok(self.submit())
    }

    async fn generate_image(
        &self,
        _request: &ImageGenerationRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        self.lock().image_requests += 1;
        Ok(self.submit())
    }

    async fn enrich_image(
        &self,
        _file: &LocalMedia,
        _request: &ImageEnrichmentRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        self.lock().image_requests += 1;
        Ok(self.submit())
    }

    async fn imitate_image(
        &self,
        _file: &LocalMedia,
        _request: &ImageImitationRequest,
    ) -> Result<TaskSubmission, ApiClientError> {
        self.lock().image_requests += 1;
        Ok(self.submit())
    }

    async fn capture_frame(
        &self,
        request: &FrameCaptureRequest,
    ) -> Result<StoredObject, ApiClientError> {
        let mut state = self.lock();
        state.captures.push(request.clone());
        if let Some((status, detail)) = &state.capture_error {
            return Err(backend(*status, detail));
        }
        state
            .capture_response
            .clone()
            .ok_or_else(|| backend(500, "no capture scripted"))
    }

    async fn sign_url(&self, gcs_uri: &str) -> Result<SignedUrl, ApiClientError> {
        let mut state = self.lock();
        state.sign_calls += 1;
        match state.signed.get(gcs_uri) {
            Some(url) => Ok(SignedUrl {
                signed_url: Some(url.clone()),
            }),
            None => Err(backend(404, "Object not found")),
        }
    }

    async fn fetch_history(&self, query: &HistoryQuery) -> Result<HistoryPage, ApiClientError> {
        let (page, gate) = {
            let mut state = self.lock();
            state.history_calls += 1;
            let page = state.history.get(&query.tab).cloned().unwrap_or_default();
            (page, state.history_gate.clone())
        };
        if let Some(gate) = gate {
            // Closed on release.
            let _ = gate.acquire().await;
        }
        Ok(page)
    }

    async fn search_history(
        &self,
        query: &HistoryQuery,
        _text: &str,
    ) -> Result<SearchPage, ApiClientError> {
        let mut state = self.lock();
        state.search_calls += 1;
        let page = state.history.get(&query.tab).cloned().unwrap_or_default();
        Ok(SearchPage {
            total_rows: page.total,
            rows: page.rows,
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Atelier types.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Any status string the backend has been seen to send, plus noise.
    pub fn arb_wire_status() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("SUCCESS".to_string()),
            Just("completed".to_string()),
            Just("FAILURE".to_string()),
            Just("failed".to_string()),
            Just("PENDING".to_string()),
            Just("pending".to_string()),
            Just("queued".to_string()),
            Just("RUNNING".to_string()),
            Just("running".to_string()),
            Just("processing".to_string()),
            "[a-z]{1,12}",
        ]
    }

    /// Statuses that never end a poll.
    pub fn arb_non_terminal_status() -> impl Strategy<Value = String> {
        arb_wire_status().prop_filter("non-terminal", |raw| {
            !TaskStatus::from_wire(raw).is_terminal()
        })
    }

    pub fn arb_position() -> impl Strategy<Value = Position> {
        (-5_000.0f64..5_000.0, -5_000.0f64..5_000.0).prop_map(|(x, y)| Position::new(x, y))
    }

    fn arb_date() -> impl Strategy<Value = Option<NaiveDate>> {
        proptest::option::of((2023i32..2027, 1u32..13, 1u32..29))
            .prop_map(|d| d.and_then(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day)))
    }

    fn arb_text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of(prop_oneof![
            Just(String::new()),
            Just("  ".to_string()),
            "[a-zA-Z0-9 ._-]{1,16}",
        ])
    }

    pub fn arb_history_filters() -> impl Strategy<Value = HistoryFilters> {
        (arb_date(), arb_date(), arb_text(), arb_text(), any::<bool>(), any::<bool>()).prop_map(
            |(start_date, end_date, status, model, is_edited, only_success)| HistoryFilters {
                start_date,
                end_date,
                status,
                model,
                is_edited,
                only_success,
            },
        )
    }

    /// One user edit against a graph. Indices pick among current nodes or
    /// edges modulo their count.
    #[derive(Debug, Clone)]
    pub enum GraphOp {
        AddNode,
        RemoveNode(usize),
        Connect(usize, usize),
        RemoveEdge(usize),
        Clear,
    }

    pub fn arb_graph_op() -> impl Strategy<Value = GraphOp> {
        prop_oneof![
            4 => Just(GraphOp::AddNode),
            2 => any::<usize>().prop_map(GraphOp::RemoveNode),
            4 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| GraphOp::Connect(a, b)),
            1 => any::<usize>().prop_map(GraphOp::RemoveEdge),
            1 => Just(GraphOp::Clear),
        ]
    }

    /// Apply `op`, ignoring rejected edits.
    pub fn apply_graph_op(graph: &mut NodeGraph, op: &GraphOp) {
        let ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id).collect();
        match op {
            GraphOp::AddNode => {
                graph.insert_node(fixtures::remote_node("https://cdn.example/clip.mp4"));
            }
            GraphOp::RemoveNode(i) if !ids.is_empty() => {
                let _ = graph.remove_node(ids[i % ids.len()]);
            }
            GraphOp::Connect(a, b) if !ids.is_empty() => {
                let _ = graph.connect(ids[a % ids.len()], ids[b % ids.len()], false);
            }
            GraphOp::RemoveEdge(i) if !graph.edges().is_empty() => {
                let id = graph.edges()[i % graph.edges().len()].id.clone();
                graph.remove_edge(&id);
            }
            GraphOp::Clear => graph.clear(),
            _ => {}
        }
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made values for common scenarios.

    use super::*;

    /// A tiny in-memory mp4 "clip".
    pub fn sample_clip() -> LocalMedia {
        LocalMedia::new("clip.mp4", vec![0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p'])
    }

    pub fn local_node() -> GraphNode {
        let clip = sample_clip();
        GraphNode::new(
            Position::default(),
            NodeData {
                video_url: clip.to_data_url(),
                source_file: Some(clip),
                ..NodeData::default()
            },
        )
    }

    pub fn remote_node(url: &str) -> GraphNode {
        GraphNode::new(
            Position::default(),
            NodeData {
                video_url: url.to_string(),
                ..NodeData::default()
            },
        )
    }

    /// A node with neither a local file nor a hosted URL.
    pub fn bare_node() -> GraphNode {
        GraphNode::new(Position::default(), NodeData::default())
    }

    /// A captured frame as the player would hand it over.
    pub fn frame_data_url() -> String {
        atelier_core::encode_data_url("image/png", &[0x89, b'P', b'N', b'G'])
    }

    pub fn history_row(gcs_uri: &str) -> HistoryRow {
        HistoryRow {
            prompt: Some("a lighthouse at dusk".into()),
            status: Some("SUCCESS".into()),
            model_used: Some(atelier_core::DEFAULT_VIDEO_MODEL.into()),
            output_video_gcs_paths: Some(json!([gcs_uri])),
            ..HistoryRow::default()
        }
    }

    pub fn history_page(rows: usize, total: u64) -> HistoryPage {
        HistoryPage {
            rows: (0..rows)
                .map(|i| history_row(&format!("gs://bucket/video-{i}.mp4")))
                .collect(),
            total,
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Atelier invariants.

    use super::*;

    /// Every edge endpoint names a present node.
    pub fn assert_edges_consistent(graph: &NodeGraph) {
        for edge in graph.edges() {
            assert!(
                graph.contains(edge.source) && graph.contains(edge.target),
                "dangling edge {}",
                edge.id
            );
        }
    }

    pub fn assert_no_node_generating(graph: &NodeGraph) {
        assert!(
            graph.nodes().iter().all(|n| !n.data.is_generating),
            "a node is still generating"
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn status_script_repeats_last_entry() {
        let api = FakeStudioApi::new();
        api.script_status("t1", vec![status("RUNNING"), status("SUCCESS")]);
        let id = TaskId::new("t1");
        assert_eq!(api.task_status(&id).await.unwrap().status, TaskStatus::Running);
        assert_eq!(api.task_status(&id).await.unwrap().status, TaskStatus::Succeeded);
        assert_eq!(api.task_status(&id).await.unwrap().status, TaskStatus::Succeeded);
        assert_eq!(api.status_calls("t1"), 3);
    }

    #[tokio::test]
    async fn queued_task_ids_come_first() {
        let api = FakeStudioApi::new();
        api.queue_task("t1");
        let request = VideoGenerationRequest::new("x", &Default::default());
        assert_eq!(api.generate_video(&request).await.unwrap().task_id.as_str(), "t1");
        assert_eq!(api.generate_video(&request).await.unwrap().task_id.as_str(), "task-2");
    }

    #[test]
    fn bare_node_has_no_media() {
        assert!(!fixtures::bare_node().data.has_source_media());
        assert!(fixtures::local_node().data.has_source_media());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_non_terminal_statuses_are_not_terminal(raw in generators::arb_non_terminal_status()) {
            prop_assert!(!TaskStatus::from_wire(&raw).is_terminal());
        }

        #[test]
        fn prop_graph_ops_keep_edges_consistent(ops in prop::collection::vec(generators::arb_graph_op(), 0..40)) {
            let mut graph = NodeGraph::new();
            for op in &ops {
                generators::apply_graph_op(&mut graph, op);
                assertions::assert_edges_consistent(&graph);
            }
        }
    }
}
