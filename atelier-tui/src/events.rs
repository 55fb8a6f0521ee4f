//! Event types for the TUI event loop.

use atelier_client::{ImageOutcome, VideoOutcome};
use atelier_core::{
    ConsumptionReport, Group, HistoryPage, HistoryTab, NodeId, NotificationBanner,
    ProcessedVideo, Project, ProjectAsset, ProjectConfig, ProjectConsumptionReport, PromptPage,
    SharedItem, UpscaleJob, UserProfile,
};
use crossterm::event::KeyEvent;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum TuiEvent {
    Input(KeyEvent),
    Tick,
    Resize { width: u16, height: u16 },
    Work(Box<WorkResult>),
    ApiError(String),
}

/// Completion of a background job. Errors are already rendered to text.
#[derive(Debug, Clone)]
pub enum WorkResult {
    Session {
        user: Result<UserProfile, String>,
        banner: Option<NotificationBanner>,
    },
    Video(Result<VideoOutcome, String>),
    Image(Result<ImageOutcome, String>),
    /// A chained generation settled. The graph store already holds the result.
    /// `Ok(None)` means the placeholder was deleted before the clip arrived.
    Chain {
        source: NodeId,
        result: Result<Option<NodeId>, String>,
    },
    GraphChanged,
    History {
        tab: HistoryTab,
        result: Result<HistoryPage, String>,
    },
    Processed(Result<ProcessedVideo, String>),
    UpscaleJobs(Result<Vec<UpscaleJob>, String>),
    Projects(Result<Vec<Project>, String>),
    ProjectDetail {
        project_id: String,
        config: Result<ProjectConfig, String>,
        assets: Result<Vec<ProjectAsset>, String>,
    },
    Groups(Result<Vec<Group>, String>),
    GroupItems {
        group_id: String,
        result: Result<Vec<SharedItem>, String>,
    },
    Analytics(Result<(ConsumptionReport, ProjectConsumptionReport), String>),
    Configurations(Result<Value, String>),
    Prompts(Result<PromptPage, String>),
    /// A cancellable job stopped before settling.
    Cancelled(JobKind),
    /// A write finished. `label` names it in the footer.
    Saved {
        label: String,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Video,
    Image,
    Chain(NodeId),
}
