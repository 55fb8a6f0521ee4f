//! Atelier Client
//!
//! Everything that talks to the studio backend: the REST client, the
//! [`StudioApi`] seam it implements, the cancellable task poller, and the
//! client-side stores built on top of them (node graph, history pages).

pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod history;
pub mod poller;
pub mod rest;
pub mod workflow;

pub use api::{CaptureSource, FrameCaptureRequest, StudioApi};
pub use config::{ApiConfig, PollingConfig};
pub use error::{ApiClientError, PollError, StoreError, WorkflowError};
pub use graph::{ChainGenerator, GraphStore, SharedGraph, Undo};
pub use history::{HistoryStore, TabState};
pub use poller::{PollHandle, TaskPoller};
pub use rest::RestClient;
pub use workflow::{GenerationWorkflow, ImageOutcome, VideoOutcome};
