//! Node-graph store and chained generation.
//!
//! [`GraphStore`] owns a [`NodeGraph`] behind a lock; [`SharedGraph`] is the
//! cloneable handle views and workers hold. [`ChainGenerator`] runs the
//! "generate next clip" workflow against it: an optimistic placeholder is
//! inserted first, and the [`Undo`] record captured at insertion removes it
//! again if any remote step fails.

use crate::api::{CaptureSource, FrameCaptureRequest, StudioApi};
use crate::workflow::resolve_playable;
use crate::{StoreError, TaskPoller, WorkflowError};
use atelier_core::{
    decode_data_url, GenerationParams, GraphError, GraphNode, LocalMedia, MediaError, NodeData,
    NodeGraph, NodeId, PlayableVideo, Position, VideoGenerationRequest, DEFAULT_PROMPT,
};
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct GraphStore {
    graph: RwLock<NodeGraph>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, NodeGraph>, StoreError> {
        self.graph.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, NodeGraph>, StoreError> {
        self.graph.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Copy of the current graph for rendering.
    pub fn snapshot(&self) -> Result<NodeGraph, StoreError> {
        Ok(self.read()?.clone())
    }

    pub fn node(&self, id: NodeId) -> Result<Option<GraphNode>, StoreError> {
        Ok(self.read()?.node(id).cloned())
    }

    /// Add a node for a clip already held in memory. No network call.
    pub fn add_video_node(&self, file: LocalMedia, position: Position) -> Result<NodeId, StoreError> {
        let node = GraphNode::new(
            position,
            NodeData {
                video_url: file.to_data_url(),
                source_file: Some(file),
                ..NodeData::default()
            },
        );
        let id = self.write()?.insert_node(node);
        tracing::debug!(node_id = %id, "added local video node");
        Ok(id)
    }

    /// Read a clip from disk and add it as a node.
    pub async fn add_video_file(&self, path: &Path, position: Position) -> Result<NodeId, WorkflowError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        Ok(self.add_video_node(LocalMedia::new(file_name, bytes), position)?)
    }

    /// Add a node for a hosted clip, optionally seeded with a prompt.
    pub fn add_remote_video_node(
        &self,
        url: &str,
        position: Position,
        prompt: Option<&str>,
    ) -> Result<NodeId, StoreError> {
        let node = GraphNode::new(
            position,
            NodeData {
                video_url: url.trim().to_string(),
                prompt: prompt.unwrap_or_default().to_string(),
                ..NodeData::default()
            },
        );
        let id = self.write()?.insert_node(node);
        tracing::debug!(node_id = %id, "added remote video node");
        Ok(id)
    }

    pub fn delete_node(&self, id: NodeId) -> Result<(), StoreError> {
        self.write()?.remove_node(id)?;
        Ok(())
    }

    pub fn update_node_prompt(&self, id: NodeId, prompt: &str) -> Result<(), StoreError> {
        let mut graph = self.write()?;
        let node = graph.node_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        node.data.prompt = prompt.to_string();
        Ok(())
    }

    pub fn update_node_params(&self, id: NodeId, params: GenerationParams) -> Result<(), StoreError> {
        let mut graph = self.write()?;
        let node = graph.node_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        node.data.params = params;
        Ok(())
    }

    /// Add a user edge. Returns the edge id.
    pub fn connect(&self, source: NodeId, target: NodeId) -> Result<String, StoreError> {
        let mut graph = self.write()?;
        let edge = graph.connect(source, target, false)?;
        Ok(edge.id.clone())
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.write()?.clear();
        Ok(())
    }

    /// Insert a generating placeholder to the right of `source` plus the
    /// animated edge leading to it, in one critical section.
    ///
    /// Returns the placeholder id, a copy of the source node as it was at
    /// insertion time, and the undo record for exactly this delta.
    pub fn begin_generation(
        &self,
        source: NodeId,
        source_frame: Option<String>,
    ) -> Result<(NodeId, GraphNode, Undo), StoreError> {
        let mut graph = self.write()?;
        let source_node = graph
            .node(source)
            .cloned()
            .ok_or(GraphError::NodeNotFound(source))?;
        if source_node.data.is_generating {
            return Err(GraphError::StillGenerating(source).into());
        }
        let placeholder = GraphNode::placeholder(&source_node, source_frame);
        let placeholder_id = graph.insert_node(placeholder);
        let edge_id = graph.connect(source, placeholder_id, true)?.id.clone();
        Ok((
            placeholder_id,
            source_node,
            Undo::new(move |graph: &mut NodeGraph| {
                graph.remove_edge(&edge_id);
                // The node may already be gone if the user deleted it mid-flight.
                let _ = graph.remove_node(placeholder_id);
            }),
        ))
    }

    /// Commit a finished generation onto its placeholder.
    ///
    /// Returns `false` when the placeholder was deleted while the generation
    /// was in flight; the result is then dropped.
    pub fn complete_generation(
        &self,
        placeholder: NodeId,
        video: &PlayableVideo,
        start_time: f64,
    ) -> Result<bool, StoreError> {
        let mut graph = self.write()?;
        let Some(node) = graph.node_mut(placeholder) else {
            tracing::debug!(placeholder = %placeholder, "placeholder deleted before its clip arrived");
            return Ok(false);
        };
        node.data.is_generating = false;
        node.data.video_url = video.url.clone();
        node.data.source_file = None;
        node.data.start_time = Some(start_time);
        node.data.prompt.clear();
        Ok(true)
    }
}

/// Cloneable handle to a [`GraphStore`].
#[derive(Debug, Clone, Default)]
pub struct SharedGraph(Arc<GraphStore>);

impl SharedGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for SharedGraph {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        &self.0
    }
}

/// Reverts one optimistic graph change.
pub struct Undo {
    revert: Box<dyn FnOnce(&mut NodeGraph) + Send>,
}

impl Undo {
    pub fn new(revert: impl FnOnce(&mut NodeGraph) + Send + 'static) -> Self {
        Self {
            revert: Box::new(revert),
        }
    }

    pub fn run(self, store: &GraphStore) -> Result<(), StoreError> {
        let mut graph = store.write()?;
        (self.revert)(&mut graph);
        Ok(())
    }
}

impl std::fmt::Debug for Undo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Undo")
    }
}

/// Runs chained generation: capture frame, generate, poll, sign.
#[derive(Clone)]
pub struct ChainGenerator {
    api: Arc<dyn StudioApi>,
    graph: SharedGraph,
    poller: TaskPoller,
}

impl ChainGenerator {
    pub fn new(api: Arc<dyn StudioApi>, graph: SharedGraph, poller: TaskPoller) -> Self {
        Self { api, graph, poller }
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    /// Generate the next clip from `source`.
    ///
    /// `captured_frame` is a `data:` URL grabbed client-side; `start_time` is
    /// the offset in seconds the frame was taken at. Resolves with the id of
    /// the node now holding the new clip, or `None` if the user deleted the
    /// placeholder meanwhile. On failure the placeholder and its edge are
    /// removed before the error is returned.
    pub async fn trigger_generation(
        &self,
        source: NodeId,
        captured_frame: Option<String>,
        start_time: f64,
        cancel: &CancellationToken,
    ) -> Result<Option<NodeId>, WorkflowError> {
        let (placeholder, source_node, undo) =
            self.graph.begin_generation(source, captured_frame.clone())?;
        tracing::info!(source = %source, placeholder = %placeholder, start_time, "chained generation started");

        match self
            .generate_from(&source_node, captured_frame.as_deref(), start_time, cancel)
            .await
        {
            Ok(video) => {
                if !self.graph.complete_generation(placeholder, &video, start_time)? {
                    return Ok(None);
                }
                tracing::info!(placeholder = %placeholder, "chained generation finished");
                Ok(Some(placeholder))
            }
            Err(err) => {
                tracing::warn!(placeholder = %placeholder, error = %err, "chained generation failed, rolling back");
                undo.run(&self.graph)?;
                Err(err)
            }
        }
    }

    async fn generate_from(
        &self,
        source: &GraphNode,
        captured_frame: Option<&str>,
        start_time: f64,
        cancel: &CancellationToken,
    ) -> Result<PlayableVideo, WorkflowError> {
        let capture_source = match (&source.data.source_file, source.data.remote_url()) {
            (Some(file), _) => CaptureSource::File(file.clone()),
            (None, Some(url)) => CaptureSource::Url(url.to_string()),
            (None, None) => return Err(GraphError::NoSourceMedia.into()),
        };
        let frame = captured_frame.map(decode_data_url).transpose()?;

        let stored = self
            .api
            .capture_frame(&FrameCaptureRequest {
                source: capture_source,
                timestamp: start_time,
                frame,
            })
            .await?;
        let frame_uri = stored
            .gcs_uri
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| WorkflowError::FrameCapture("No GCS URI returned.".into()))?;

        let prompt = match source.data.prompt.trim() {
            "" => DEFAULT_PROMPT,
            prompt => prompt,
        };
        let request =
            VideoGenerationRequest::new(prompt, &source.data.params).with_first_frame(frame_uri);
        let submission = self.api.generate_video(&request).await?;
        tracing::debug!(task_id = %submission.task_id, "chained generation submitted");

        let result = self
            .poller
            .poll_video_result(&submission.task_id, cancel)
            .await?;
        let video = result.first_video()?;
        let playable = resolve_playable(self.api.as_ref(), video)
            .await
            .ok_or(MediaError::NoPlaybackUrl)?;
        Ok(playable)
    }
}
