//! Node graph of chained video clips.
//!
//! Each node is a clip; an edge `a -> b` records that `b` was generated from a
//! frame of `a`. [`NodeGraph`] keeps the one structural invariant: every edge
//! endpoint names a node that is present.

use crate::{encode_data_url, mime_from_file_name, GenerationParams, GraphError, NodeId};
use serde::{Deserialize, Serialize};

/// Horizontal gap between a source node and the clip generated from it.
pub const CHAIN_OFFSET_X: f64 = 450.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Where a clip generated from this position is placed.
    pub fn chained(&self) -> Self {
        Self {
            x: self.x + CHAIN_OFFSET_X,
            y: self.y,
        }
    }
}

/// A media file held in memory after being picked from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMedia {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LocalMedia {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_from_file_name(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn to_data_url(&self) -> String {
        encode_data_url(&self.mime_type, &self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    /// Playable URL: a `data:` URL for local files, otherwise a hosted URL.
    /// Empty while the node is generating.
    pub video_url: String,
    #[serde(skip)]
    pub source_file: Option<LocalMedia>,
    pub prompt: String,
    pub params: GenerationParams,
    pub is_generating: bool,
    #[serde(default)]
    pub source_frame: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
}

impl NodeData {
    /// Hosted URL usable for server-side frame capture.
    pub fn remote_url(&self) -> Option<&str> {
        let url = self.video_url.trim();
        if url.is_empty() || url.starts_with("data:") {
            None
        } else {
            Some(url)
        }
    }

    pub fn has_source_media(&self) -> bool {
        self.source_file.is_some() || self.remote_url().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub position: Position,
    pub data: NodeData,
}

impl GraphNode {
    pub fn new(position: Position, data: NodeData) -> Self {
        Self {
            id: NodeId::new(),
            position,
            data,
        }
    }

    /// Placeholder shown while a clip is generated from `source`.
    pub fn placeholder(source: &GraphNode, source_frame: Option<String>) -> Self {
        Self::new(
            source.position.chained(),
            NodeData {
                is_generating: true,
                source_frame,
                params: source.data.params.clone(),
                ..NodeData::default()
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub animated: bool,
}

impl GraphEdge {
    pub fn new(source: NodeId, target: NodeId, animated: bool) -> Self {
        Self {
            id: Self::edge_id(source, target),
            source,
            target,
            animated,
        }
    }

    pub fn edge_id(source: NodeId, target: NodeId) -> String {
        format!("e-{}-{}", source, target)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert_node(&mut self, node: GraphNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<GraphNode, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.edges.retain(|e| !e.touches(id));
        Ok(self.nodes.remove(index))
    }

    /// Add an edge between two present nodes.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        animated: bool,
    ) -> Result<&GraphEdge, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source));
        }
        for id in [source, target] {
            if !self.contains(id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            return Err(GraphError::DuplicateEdge {
                from: source,
                to: target,
            });
        }
        self.edges.push(GraphEdge::new(source, target, animated));
        let last = self.edges.len() - 1;
        Ok(&self.edges[last])
    }

    /// Remove one edge by id. Returns whether it was present.
    pub fn remove_edge(&mut self, edge_id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != edge_id);
        self.edges.len() != before
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Nodes with no incoming edge, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(move |n| !self.edges.iter().any(|e| e.target == n.id))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.source == id)
            .map(|e| e.target)
    }

    /// True when no edge references a missing node.
    pub fn edges_are_consistent(&self) -> bool {
        self.edges
            .iter()
            .all(|e| self.contains(e.source) && self.contains(e.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(url: &str) -> GraphNode {
        GraphNode::new(
            Position::default(),
            NodeData {
                video_url: url.into(),
                ..NodeData::default()
            },
        )
    }

    #[test]
    fn removing_node_drops_touching_edges() {
        let mut graph = NodeGraph::new();
        let a = graph.insert_node(remote("https://a"));
        let b = graph.insert_node(remote("https://b"));
        let c = graph.insert_node(remote("https://c"));
        graph.connect(a, b, false).unwrap();
        graph.connect(b, c, false).unwrap();

        graph.remove_node(b).unwrap();
        assert!(graph.edges().is_empty());
        assert!(graph.edges_are_consistent());
    }

    #[test]
    fn connect_rejects_bad_edges() {
        let mut graph = NodeGraph::new();
        let a = graph.insert_node(remote("https://a"));
        let b = graph.insert_node(remote("https://b"));
        let ghost = NodeId::new();

        assert_eq!(graph.connect(a, a, false), Err(GraphError::SelfLoop(a)));
        assert_eq!(
            graph.connect(a, ghost, false),
            Err(GraphError::NodeNotFound(ghost))
        );
        let id = graph.connect(a, b, false).unwrap().id.clone();
        assert_eq!(id, format!("e-{}-{}", a, b));
        assert!(matches!(
            graph.connect(a, b, true),
            Err(GraphError::DuplicateEdge { .. })
        ));
    }

    #[test]
    fn placeholder_sits_to_the_right() {
        let source = GraphNode::new(Position::new(10.0, 20.0), NodeData::default());
        let placeholder = GraphNode::placeholder(&source, None);
        assert_eq!(placeholder.position, Position::new(460.0, 20.0));
        assert!(placeholder.data.is_generating);
        assert!(placeholder.data.video_url.is_empty());
    }

    #[test]
    fn data_urls_are_not_remote() {
        let data = NodeData {
            video_url: "data:video/mp4;base64,AAAA".into(),
            ..NodeData::default()
        };
        assert!(data.remote_url().is_none());
        assert!(!data.has_source_media());
    }

    #[test]
    fn roots_skip_generated_clips() {
        let mut graph = NodeGraph::new();
        let a = graph.insert_node(remote("https://a"));
        let b = graph.insert_node(remote("https://b"));
        graph.connect(a, b, true).unwrap();
        let roots: Vec<_> = graph.roots().map(|n| n.id).collect();
        assert_eq!(roots, vec![a]);
        assert_eq!(graph.children(a).collect::<Vec<_>>(), vec![b]);
    }
}
