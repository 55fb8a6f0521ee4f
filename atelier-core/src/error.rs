//! Error types for Atelier data handling

use crate::NodeId;
use thiserror::Error;

/// Validation errors raised before a request leaves the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors decoding or extracting media payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Malformed data URL: {reason}")]
    MalformedDataUrl { reason: String },

    #[error("Generation succeeded but no {kind} data returned.")]
    NoMediaReturned { kind: &'static str },

    #[error("Could not obtain a valid playback URL for the generated video.")]
    NoPlaybackUrl,

    #[error("Malformed task result: {reason}")]
    MalformedResult { reason: String },
}

/// Node-graph invariant violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge {from} -> {to} already exists")]
    DuplicateEdge { from: NodeId, to: NodeId },

    #[error("A node cannot be connected to itself: {0}")]
    SelfLoop(NodeId),

    #[error("No source media available.")]
    NoSourceMedia,

    #[error("Node {0} is still generating")]
    StillGenerating(NodeId),
}
