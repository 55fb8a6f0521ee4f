//! Application state and view state definitions.

use crate::commands::{Command, FilterCommand, ImageMode};
use crate::config::TuiConfig;
use crate::events::{JobKind, WorkResult};
use crate::jobs::{Collection, ImageJob, Jobs};
use crate::nav::View;
use crate::notifications::{Notification, NotificationLevel};
use crate::persistence::PersistedState;
use crate::theme::AtelierTheme;
use crate::widgets::{TextInput, TreeItem};
use atelier_client::{
    ChainGenerator, GenerationWorkflow, HistoryStore, ImageOutcome, PollingConfig, RestClient,
    SharedGraph, StudioApi, TabState, TaskPoller, VideoOutcome,
};
use atelier_core::{
    ClipRequest, ConsumptionReport, DateRange, DocumentId, DubRequest, GenerationParams, Group,
    HistoryRow, HistoryTab, ImageData, ImageEnrichmentRequest, ImageGenerationRequest,
    ImageImitationRequest, NodeGraph, NodeId, PlayableVideo, ProcessedVideo, Project,
    ProjectAsset, ProjectConfig, ProjectConfigEntry, ProjectConsumptionReport, PromptPage,
    RaiReason, SharedItem, UpscaleJob, UpscaleRequest, UserProfile, VideoGenerationRequest,
    DEFAULT_IMAGE_MODEL, DEFAULT_PAGE_SIZE,
};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Client-side services shared by every view.
#[derive(Clone)]
pub struct Services {
    pub rest: RestClient,
    pub workflow: GenerationWorkflow,
    pub chain: ChainGenerator,
    pub history: Arc<HistoryStore>,
    pub graph: SharedGraph,
}

impl Services {
    pub fn new(rest: RestClient, polling: &PollingConfig) -> Self {
        let api: Arc<dyn StudioApi> = Arc::new(rest.clone());
        Self::with_api(rest, api, polling)
    }

    /// Generation, polling and history go through `api`; the admin pages
    /// always use `rest`.
    pub fn with_api(rest: RestClient, api: Arc<dyn StudioApi>, polling: &PollingConfig) -> Self {
        let video_poller = TaskPoller::new(api.clone(), polling.video_interval());
        let image_poller = TaskPoller::new(api.clone(), polling.image_interval());
        let chain_poller = TaskPoller::new(api.clone(), polling.chain_interval());
        let graph = SharedGraph::new();
        Self {
            rest,
            workflow: GenerationWorkflow::new(api.clone(), video_poller, image_poller),
            chain: ChainGenerator::new(api.clone(), graph.clone(), chain_poller),
            history: Arc::new(HistoryStore::new(api)),
            graph,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Modal {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct GenerateViewState {
    pub prompt: String,
    pub params: GenerationParams,
    pub first_frame: Option<String>,
    pub last_frame: Option<String>,
    pub project_id: Option<DocumentId>,
    pub running: Option<CancellationToken>,
    pub outcome: Option<VideoOutcome>,
    pub selected: Option<usize>,
    pub error: Option<String>,
    pub processed: Option<ProcessedVideo>,
    pub upscale_jobs: Vec<UpscaleJob>,
}

impl GenerateViewState {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            params: GenerationParams::default(),
            first_frame: None,
            last_frame: None,
            project_id: None,
            running: None,
            outcome: None,
            selected: None,
            error: None,
            processed: None,
            upscale_jobs: Vec::new(),
        }
    }

    pub fn request(&self) -> VideoGenerationRequest {
        let mut request = VideoGenerationRequest::new(self.prompt.trim(), &self.params)
            .with_project(self.project_id.clone());
        if let Some(uri) = &self.first_frame {
            request = request.with_first_frame(uri.clone());
        }
        if let Some(uri) = &self.last_frame {
            request = request.with_final_frame(uri.clone());
        }
        request
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn videos(&self) -> &[PlayableVideo] {
        self.outcome
            .as_ref()
            .map(|o| o.videos.as_slice())
            .unwrap_or_default()
    }

    pub fn selected_video(&self) -> Option<&PlayableVideo> {
        self.selected.and_then(|i| self.videos().get(i))
    }

    pub fn revised_prompt(&self) -> Option<&str> {
        self.outcome
            .as_ref()
            .and_then(|o| o.revised_prompt.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

impl Default for GenerateViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ImageViewState {
    pub mode: ImageMode,
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub sample_count: u32,
    pub source: Option<PathBuf>,
    pub project_id: Option<DocumentId>,
    pub running: Option<CancellationToken>,
    pub outcome: Option<ImageOutcome>,
    pub selected: Option<usize>,
    pub error: Option<String>,
}

impl ImageViewState {
    pub fn new() -> Self {
        Self {
            mode: ImageMode::Generate,
            prompt: String::new(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            aspect_ratio: "1:1".to_string(),
            sample_count: 1,
            source: None,
            project_id: None,
            running: None,
            outcome: None,
            selected: None,
            error: None,
        }
    }

    /// Resolve the form into a job for the current mode.
    pub fn job(&self) -> Result<ImageJob, String> {
        let prompt = self.prompt.trim().to_string();
        let source = || {
            self.source
                .clone()
                .ok_or_else(|| "Choose a source image with :source <path>.".to_string())
        };
        match self.mode {
            ImageMode::Generate => {
                let mut request = ImageGenerationRequest::new(prompt);
                request.model = self.model.clone();
                request.aspect_ratio = self.aspect_ratio.clone();
                request.sample_count = self.sample_count;
                request.creative_project_id = self.project_id.clone();
                Ok(ImageJob::Generate(request))
            }
            ImageMode::Enrich => Ok(ImageJob::Enrich {
                source: source()?,
                request: ImageEnrichmentRequest {
                    sub_prompt: prompt,
                    model: self.model.clone(),
                    creative_project_id: self.project_id.clone(),
                },
            }),
            ImageMode::Imitate => Ok(ImageJob::Imitate {
                source: source()?,
                request: ImageImitationRequest {
                    sub_prompt: prompt,
                    model: self.model.clone(),
                    sample_count: self.sample_count,
                    creative_project_id: self.project_id.clone(),
                    ..ImageImitationRequest::default()
                },
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn images(&self) -> &[ImageData] {
        self.outcome
            .as_ref()
            .map(|o| o.images.as_slice())
            .unwrap_or_default()
    }

    pub fn revised_prompt(&self) -> Option<&str> {
        self.outcome
            .as_ref()
            .and_then(|o| o.revised_prompt.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

impl Default for ImageViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryViewState {
    pub tab: HistoryTab,
    pub state: TabState,
    pub selected: Option<usize>,
    pub loading: bool,
}

impl HistoryViewState {
    pub fn new() -> Self {
        Self {
            tab: HistoryTab::Video,
            state: TabState::default(),
            selected: None,
            loading: false,
        }
    }

    pub fn selected_row(&self) -> Option<&HistoryRow> {
        self.selected.and_then(|i| self.state.rows.get(i))
    }
}

impl Default for HistoryViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct GraphViewState {
    pub graph: NodeGraph,
    pub selected: Option<NodeId>,
    /// Source end of the next `connect`.
    pub marked: Option<NodeId>,
    pub expanded: HashSet<NodeId>,
    /// Offset in seconds the next chained frame is captured at.
    pub capture_time: f64,
    pub running: Vec<(NodeId, CancellationToken)>,
    pub error: Option<String>,
}

impl GraphViewState {
    pub fn new() -> Self {
        Self {
            graph: NodeGraph::new(),
            selected: None,
            marked: None,
            expanded: HashSet::new(),
            capture_time: 0.0,
            running: Vec::new(),
            error: None,
        }
    }

    /// Nodes in display order: roots first, children under expanded
    /// parents. Nodes only reachable through a cycle are listed last.
    pub fn tree_items(&self) -> Vec<TreeItem> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let roots: Vec<NodeId> = self.graph.roots().map(|n| n.id).collect();
        for root in roots {
            self.walk(root, 0, &mut visited, &mut items);
        }
        let rest: Vec<NodeId> = self
            .graph
            .nodes()
            .iter()
            .map(|n| n.id)
            .filter(|id| !visited.contains(id))
            .collect();
        for id in rest {
            if !visited.contains(&id) {
                self.walk(id, 0, &mut visited, &mut items);
            }
        }
        items
    }

    fn walk(
        &self,
        id: NodeId,
        depth: usize,
        visited: &mut HashSet<NodeId>,
        output: &mut Vec<TreeItem>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(node) = self.graph.node(id) else {
            return;
        };
        let children: Vec<NodeId> = self.graph.children(id).collect();
        let expanded = self.expanded.contains(&id);
        let label = if node.data.prompt.trim().is_empty() {
            node.data
                .source_file
                .as_ref()
                .map(|f| f.file_name.clone())
                .unwrap_or_else(|| short_url(&node.data.video_url))
        } else {
            node.data.prompt.clone()
        };
        output.push(TreeItem {
            id,
            label,
            depth,
            expanded,
            has_children: !children.is_empty(),
            generating: node.data.is_generating,
            marked: self.marked == Some(id),
        });
        if expanded {
            for child in children {
                self.walk(child, depth + 1, visited, output);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }
}

impl Default for GraphViewState {
    fn default() -> Self {
        Self::new()
    }
}

fn short_url(url: &str) -> String {
    if url.is_empty() {
        return "new clip".to_string();
    }
    if url.starts_with("data:") {
        return "local clip".to_string();
    }
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ProjectsViewState {
    pub projects: Vec<Project>,
    pub selected: Option<usize>,
    pub config: Option<ProjectConfig>,
    pub assets: Vec<ProjectAsset>,
    pub error: Option<String>,
}

impl ProjectsViewState {
    pub fn selected_project(&self) -> Option<&Project> {
        self.selected.and_then(|i| self.projects.get(i))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupsViewState {
    pub groups: Vec<Group>,
    pub selected: Option<usize>,
    pub items: Vec<SharedItem>,
    pub item_selected: Option<usize>,
    /// Cursor is in the shared-items list rather than the group list.
    pub focus_items: bool,
    pub error: Option<String>,
}

impl GroupsViewState {
    pub fn selected_group(&self) -> Option<&Group> {
        self.selected.and_then(|i| self.groups.get(i))
    }

    pub fn selected_item(&self) -> Option<&SharedItem> {
        self.item_selected.and_then(|i| self.items.get(i))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsViewState {
    pub range: DateRange,
    pub report: Option<ConsumptionReport>,
    pub by_project: Option<ProjectConsumptionReport>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationsViewState {
    pub document: Option<Value>,
    pub dirty: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PromptsViewState {
    pub page: PromptPage,
    pub page_number: u32,
    pub tags: Option<String>,
    pub selected: Option<usize>,
    pub error: Option<String>,
}

impl PromptsViewState {
    pub fn new() -> Self {
        Self {
            page: PromptPage::default(),
            page_number: 1,
            tags: None,
            selected: None,
            error: None,
        }
    }

    pub fn total_pages(&self) -> u64 {
        let size = u64::from(DEFAULT_PAGE_SIZE);
        self.page.total.div_ceil(size).max(1)
    }
}

impl Default for PromptsViewState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    pub config: TuiConfig,
    pub theme: AtelierTheme,
    pub services: Services,
    pub active_view: View,
    pub user: Option<UserProfile>,
    pub banner: Vec<String>,

    pub generate_view: GenerateViewState,
    pub image_view: ImageViewState,
    pub history_view: HistoryViewState,
    pub graph_view: GraphViewState,
    pub projects_view: ProjectsViewState,
    pub groups_view: GroupsViewState,
    pub analytics_view: AnalyticsViewState,
    pub configurations_view: ConfigurationsViewState,
    pub prompts_view: PromptsViewState,

    pub notifications: Vec<Notification>,
    pub command_palette: Option<TextInput>,
    pub search: Option<TextInput>,
    pub modal: Option<Modal>,

    shutdown: CancellationToken,
}

impl App {
    pub fn new(config: TuiConfig, services: Services) -> Self {
        Self {
            config,
            theme: AtelierTheme::atelier(),
            services,
            active_view: View::Generate,
            user: None,
            banner: Vec::new(),
            generate_view: GenerateViewState::new(),
            image_view: ImageViewState::new(),
            history_view: HistoryViewState::new(),
            graph_view: GraphViewState::new(),
            projects_view: ProjectsViewState::default(),
            groups_view: GroupsViewState::default(),
            analytics_view: AnalyticsViewState::default(),
            configurations_view: ConfigurationsViewState::default(),
            prompts_view: PromptsViewState::new(),
            notifications: Vec::new(),
            command_palette: None,
            search: None,
            modal: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn restore(&mut self, state: &PersistedState) {
        // Admin views are re-checked once the session is known.
        if !state.active_view.requires_admin() {
            self.active_view = state.active_view;
        }
        self.history_view.tab = state.history_tab;
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            active_view: self.active_view,
            history_tab: self.history_view.tab,
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification::new(level, message));
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(UserProfile::is_admin)
    }

    /// Token for a cancellable job. Cancelled with everything else on quit.
    pub fn job_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Stop every in-flight poll.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn switch_view(&mut self, view: View, jobs: &Jobs) {
        if view == self.active_view {
            return;
        }
        if view.requires_admin() && !self.is_admin() {
            self.notify(
                NotificationLevel::Warning,
                format!("{} is only available to admins.", view.title()),
            );
            return;
        }
        self.active_view = view;
        self.load_view(jobs);
    }

    /// Step through the view tabs, skipping the ones this user cannot open.
    pub fn cycle_view(&mut self, forward: bool, jobs: &Jobs) {
        let mut view = self.active_view;
        for _ in 0..View::all().len() {
            view = if forward { view.next() } else { view.previous() };
            if !view.requires_admin() || self.is_admin() {
                break;
            }
        }
        self.switch_view(view, jobs);
    }

    /// Fetch what the active view needs the first time it is shown.
    pub fn load_view(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::History => self.fetch_history(jobs, false),
            View::InfiniteGraph => self.sync_graph(),
            View::Projects if self.projects_view.projects.is_empty() => {
                jobs.list_projects(&self.services)
            }
            View::Groups if self.groups_view.groups.is_empty() => jobs.list_groups(&self.services),
            View::Analytics if self.analytics_view.report.is_none() => self.fetch_analytics(jobs),
            View::Configurations if self.configurations_view.document.is_none() => {
                jobs.configurations(&self.services)
            }
            View::Prompts if self.prompts_view.page.rows.is_empty() => self.fetch_prompts(jobs),
            _ => {}
        }
    }

    /// Re-fetch the active view, bypassing caches.
    pub fn refresh(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::Generate => jobs.upscale_jobs(&self.services),
            View::Images => {}
            View::History => {
                self.history_view.loading = true;
                jobs.refresh_history(&self.services, self.history_view.tab);
            }
            View::InfiniteGraph => self.sync_graph(),
            View::Projects => jobs.list_projects(&self.services),
            View::Groups => jobs.list_groups(&self.services),
            View::Analytics => self.fetch_analytics(jobs),
            View::Configurations => jobs.configurations(&self.services),
            View::Prompts => self.fetch_prompts(jobs),
        }
    }

    pub fn on_tick(&mut self) {
        if self.graph_view.is_running() {
            self.sync_graph();
        }
    }

    pub fn sync_graph(&mut self) {
        match self.services.graph.snapshot() {
            Ok(graph) => {
                if let Some(selected) = self.graph_view.selected {
                    if !graph.contains(selected) {
                        self.graph_view.selected = None;
                    }
                }
                if let Some(marked) = self.graph_view.marked {
                    if !graph.contains(marked) {
                        self.graph_view.marked = None;
                    }
                }
                self.graph_view.graph = graph;
            }
            Err(err) => self.graph_view.error = Some(err.to_string()),
        }
    }

    fn fetch_history(&mut self, jobs: &Jobs, force: bool) {
        self.history_view.loading = true;
        jobs.fetch_history(&self.services, self.history_view.tab, force);
    }

    fn fetch_analytics(&mut self, jobs: &Jobs) {
        self.analytics_view.loading = true;
        jobs.analytics(&self.services, self.analytics_view.range);
    }

    fn fetch_prompts(&mut self, jobs: &Jobs) {
        jobs.list_prompts(
            &self.services,
            self.prompts_view.tags.clone(),
            self.prompts_view.page_number,
            DEFAULT_PAGE_SIZE,
        );
    }

    fn sync_history(&mut self) {
        match self.services.history.state(self.history_view.tab) {
            Ok(state) => {
                let len = state.rows.len();
                self.history_view.state = state;
                self.history_view.selected = match self.history_view.selected {
                    _ if len == 0 => None,
                    Some(i) if i < len => Some(i),
                    _ => Some(0),
                };
            }
            Err(err) => self.history_view.state.error = Some(err.to_string()),
        }
    }

    fn set_view_error(&mut self, message: String) {
        let slot = match self.active_view {
            View::Generate => &mut self.generate_view.error,
            View::Images => &mut self.image_view.error,
            View::History => &mut self.history_view.state.error,
            View::InfiniteGraph => &mut self.graph_view.error,
            View::Projects => &mut self.projects_view.error,
            View::Groups => &mut self.groups_view.error,
            View::Analytics => &mut self.analytics_view.error,
            View::Configurations => &mut self.configurations_view.error,
            View::Prompts => &mut self.prompts_view.error,
        };
        *slot = Some(message);
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn select_next(&mut self) {
        self.step_selection(true);
    }

    pub fn select_previous(&mut self) {
        self.step_selection(false);
    }

    fn step_selection(&mut self, forward: bool) {
        let step: fn(usize, &mut Option<usize>) = if forward {
            select_next_index
        } else {
            select_prev_index
        };
        match self.active_view {
            View::Generate => {
                let len = self.generate_view.videos().len();
                step(len, &mut self.generate_view.selected);
            }
            View::Images => {
                let len = self
                    .image_view
                    .outcome
                    .as_ref()
                    .map_or(0, |o| o.images.len());
                step(len, &mut self.image_view.selected);
            }
            View::History => step(self.history_view.state.rows.len(), &mut self.history_view.selected),
            View::InfiniteGraph => {
                let ids: Vec<NodeId> = self.graph_view.tree_items().iter().map(|i| i.id).collect();
                let mut index = self
                    .graph_view
                    .selected
                    .and_then(|id| ids.iter().position(|i| *i == id));
                step(ids.len(), &mut index);
                self.graph_view.selected = index.and_then(|i| ids.get(i).copied());
            }
            View::Projects => {
                step(self.projects_view.projects.len(), &mut self.projects_view.selected);
                self.projects_view.config = None;
                self.projects_view.assets.clear();
            }
            View::Groups => {
                if self.groups_view.focus_items {
                    step(self.groups_view.items.len(), &mut self.groups_view.item_selected);
                } else {
                    step(self.groups_view.groups.len(), &mut self.groups_view.selected);
                    self.groups_view.items.clear();
                    self.groups_view.item_selected = None;
                }
            }
            View::Prompts => step(self.prompts_view.page.rows.len(), &mut self.prompts_view.selected),
            View::Analytics | View::Configurations => {}
        }
    }

    pub fn toggle_expand(&mut self) {
        if self.active_view == View::InfiniteGraph {
            if let Some(id) = self.graph_view.selected {
                if !self.graph_view.expanded.remove(&id) {
                    self.graph_view.expanded.insert(id);
                }
            }
        }
    }

    pub fn move_focus(&mut self, right: bool) {
        if self.active_view == View::Groups {
            self.groups_view.focus_items = right && !self.groups_view.items.is_empty();
            if self.groups_view.focus_items && self.groups_view.item_selected.is_none() {
                self.groups_view.item_selected = Some(0);
            }
        }
    }

    /// Mark the selected graph node as the source of the next `connect`.
    pub fn toggle_mark(&mut self) {
        if self.active_view == View::InfiniteGraph {
            self.graph_view.marked = match (self.graph_view.marked, self.graph_view.selected) {
                (Some(marked), Some(selected)) if marked == selected => None,
                (_, selected) => selected,
            };
        }
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Submit the active form, or chain from the selected graph node.
    pub fn generate(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::Generate => {
                if self.generate_view.is_running() {
                    self.notify(NotificationLevel::Warning, "A generation is already running.");
                    return;
                }
                let request = self.generate_view.request();
                if let Err(err) = request.validate() {
                    self.generate_view.error = Some(err.to_string());
                    return;
                }
                let token = self.job_token();
                self.generate_view.running = Some(token.clone());
                self.generate_view.outcome = None;
                self.generate_view.selected = None;
                self.generate_view.error = None;
                tracing::info!(model = %request.model, "video generation submitted");
                jobs.generate_video(&self.services, request, token);
            }
            View::Images => {
                if self.image_view.is_running() {
                    self.notify(NotificationLevel::Warning, "A generation is already running.");
                    return;
                }
                let job = match self.image_view.job() {
                    Ok(job) => job,
                    Err(err) => {
                        self.image_view.error = Some(err);
                        return;
                    }
                };
                let token = self.job_token();
                self.image_view.running = Some(token.clone());
                self.image_view.outcome = None;
                self.image_view.selected = None;
                self.image_view.error = None;
                jobs.generate_image(&self.services, job, token);
            }
            View::InfiniteGraph => {
                let Some(source) = self.graph_view.selected else {
                    self.graph_view.error = Some("Select a clip to continue from.".into());
                    return;
                };
                let token = self.job_token();
                self.graph_view.running.push((source, token.clone()));
                self.graph_view.error = None;
                self.graph_view.expanded.insert(source);
                jobs.chain_generation(&self.services, source, self.graph_view.capture_time, token);
            }
            _ => {}
        }
    }

    /// Esc: close the modal, otherwise stop the active view's job.
    pub fn cancel(&mut self) {
        if self.modal.take().is_some() {
            return;
        }
        if self.notifications.last().is_some_and(|n| n.dismissable) {
            self.notifications.pop();
            return;
        }
        match self.active_view {
            View::Generate => {
                if let Some(token) = &self.generate_view.running {
                    token.cancel();
                }
            }
            View::Images => {
                if let Some(token) = &self.image_view.running {
                    token.cancel();
                }
            }
            View::InfiniteGraph => {
                for (_, token) in &self.graph_view.running {
                    token.cancel();
                }
            }
            _ => {}
        }
    }

    pub fn confirm(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::Projects => {
                if let Some(project) = self.projects_view.selected_project() {
                    jobs.project_detail(&self.services, project.id.clone());
                }
            }
            View::Groups => {
                if let Some(group) = self.groups_view.selected_group() {
                    jobs.group_items(&self.services, group.id.clone());
                }
            }
            View::InfiniteGraph => self.toggle_expand(),
            _ => {}
        }
    }

    pub fn delete(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::InfiniteGraph => {
                let Some(id) = self.graph_view.selected else {
                    return;
                };
                if let Err(err) = self.services.graph.delete_node(id) {
                    self.graph_view.error = Some(err.to_string());
                }
                self.sync_graph();
            }
            View::Prompts => {
                if let Some(prompt) = self
                    .prompts_view
                    .selected
                    .and_then(|i| self.prompts_view.page.rows.get(i))
                {
                    jobs.delete_prompt(&self.services, prompt.id.clone());
                }
            }
            View::Groups if self.groups_view.focus_items => {
                if let Some(item) = self.groups_view.selected_item() {
                    jobs.delete_shared_item(&self.services, item.id.clone());
                }
            }
            _ => {}
        }
    }

    pub fn next_tab(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::History => {
                self.history_view.tab = self.history_view.tab.next();
                self.history_view.selected = None;
                self.sync_history();
                self.fetch_history(jobs, false);
            }
            View::Images => self.image_view.mode = self.image_view.mode.next(),
            _ => {}
        }
    }

    pub fn change_page(&mut self, forward: bool, jobs: &Jobs) {
        match self.active_view {
            View::History => {
                let state = &self.history_view.state;
                let page = if forward {
                    u64::from(state.page) < state.total_pages()
                } else {
                    state.page > 1
                }
                .then(|| if forward { state.page + 1 } else { state.page - 1 });
                let Some(page) = page else {
                    return;
                };
                if let Err(err) = self.services.history.set_page(self.history_view.tab, page) {
                    self.history_view.state.error = Some(err.to_string());
                    return;
                }
                self.history_view.selected = None;
                self.fetch_history(jobs, false);
            }
            View::Prompts => {
                let view = &mut self.prompts_view;
                if forward && u64::from(view.page_number) < view.total_pages() {
                    view.page_number += 1;
                } else if !forward && view.page_number > 1 {
                    view.page_number -= 1;
                } else {
                    return;
                }
                view.selected = None;
                self.fetch_prompts(jobs);
            }
            _ => {}
        }
    }

    pub fn clear_filters(&mut self, jobs: &Jobs) {
        match self.active_view {
            View::History => {
                self.history_view.loading = true;
                self.history_view.selected = None;
                jobs.clear_history_filters(&self.services, self.history_view.tab);
            }
            View::Analytics => {
                self.analytics_view.range = DateRange::default();
                self.fetch_analytics(jobs);
            }
            View::Prompts => {
                self.prompts_view.tags = None;
                self.prompts_view.page_number = 1;
                self.fetch_prompts(jobs);
            }
            _ => {}
        }
    }

    /// Open the palette with a verb pre-filled for the active view.
    pub fn open_palette_for(&mut self, edit: bool) {
        let prefill = match (self.active_view, edit) {
            (View::Generate, true) => format!("prompt {}", self.generate_view.prompt),
            (View::Images, true) => format!("prompt {}", self.image_view.prompt),
            (View::InfiniteGraph, true) => {
                let prompt = self
                    .graph_view
                    .selected
                    .and_then(|id| self.graph_view.graph.node(id))
                    .map(|n| n.data.prompt.clone())
                    .unwrap_or_default();
                format!("prompt {}", prompt)
            }
            (View::Configurations, true) => "set ".to_string(),
            (View::Projects, true) => "quota ".to_string(),
            (View::Projects | View::Groups, false) => "new ".to_string(),
            (View::InfiniteGraph, false) => "add-video ".to_string(),
            (View::Prompts, false) => "save-prompt ".to_string(),
            (View::History, false) => "share group ".to_string(),
            _ => String::new(),
        };
        self.command_palette = Some(TextInput::with_value(prefill));
    }

    /// Start a share of the selected history item.
    pub fn share(&mut self) {
        if self.active_view != View::History {
            return;
        }
        if self.history_view.selected_row().is_none() {
            self.history_view.state.error = Some("Select an item to share.".into());
            return;
        }
        self.command_palette = Some(TextInput::with_value("share group "));
    }

    pub fn open_search(&mut self) {
        let current = match self.active_view {
            View::History => self.history_view.state.search_text.clone(),
            View::Prompts => self.prompts_view.tags.clone().unwrap_or_default(),
            _ => return,
        };
        self.search = Some(TextInput::with_value(current));
    }

    /// Apply the search box: similarity search in history, tag filter in
    /// the prompt gallery.
    pub fn submit_search(&mut self, text: &str, jobs: &Jobs) {
        match self.active_view {
            View::History => {
                if let Err(err) = self
                    .services
                    .history
                    .set_search_text(self.history_view.tab, text)
                {
                    self.history_view.state.error = Some(err.to_string());
                    return;
                }
                self.history_view.selected = None;
                self.fetch_history(jobs, false);
            }
            View::Prompts => {
                self.prompts_view.tags = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                self.prompts_view.page_number = 1;
                self.fetch_prompts(jobs);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn execute(&mut self, command: Command, jobs: &Jobs) {
        let name = command.name();
        let handled = match self.active_view {
            View::Generate => self.execute_generate(command, jobs),
            View::Images => self.execute_images(command),
            View::History => self.execute_history(command, jobs),
            View::InfiniteGraph => self.execute_graph(command, jobs),
            View::Projects => self.execute_collection(Collection::Project, command, jobs),
            View::Groups => self.execute_collection(Collection::Group, command, jobs),
            View::Analytics => self.execute_analytics(command, jobs),
            View::Configurations => self.execute_configurations(command, jobs),
            View::Prompts => self.execute_prompts(command, jobs),
        };
        if !handled {
            self.set_view_error(format!(
                "`{}` does not apply to {}.",
                name,
                self.active_view.title()
            ));
        }
    }

    fn execute_generate(&mut self, command: Command, jobs: &Jobs) -> bool {
        let view = &mut self.generate_view;
        match command {
            Command::Prompt(text) => view.prompt = text,
            Command::Model(model) => view.params.model = model,
            Command::Aspect(ratio) => view.params.aspect_ratio = ratio,
            Command::Duration(seconds) => view.params.duration = seconds,
            Command::Samples(count) => view.params.sample_count = count,
            Command::Resolution(resolution) => view.params.resolution = resolution,
            Command::Audio(on) => view.params.generate_audio = on,
            Command::Enhance(on) => view.params.enhance_prompt = on,
            Command::FirstFrame(uri) => view.first_frame = uri,
            Command::LastFrame(uri) => view.last_frame = uri,
            Command::Project(id) => view.project_id = id,
            command @ (Command::Clip { .. } | Command::Dub(_) | Command::Upscale(_)) => {
                let uri = view.selected_video().map(|v| v.gcs_uri.clone());
                return self.post_process(uri, command, jobs);
            }
            _ => return false,
        }
        view.error = view.params.validate().err().map(|e| e.to_string());
        true
    }

    fn execute_images(&mut self, command: Command) -> bool {
        let view = &mut self.image_view;
        match command {
            Command::Prompt(text) => view.prompt = text,
            Command::Model(model) => view.model = model,
            Command::Aspect(ratio) => view.aspect_ratio = ratio,
            Command::Samples(count) => view.sample_count = count,
            Command::Project(id) => view.project_id = id,
            Command::Mode(mode) => view.mode = mode,
            Command::Source(path) => view.source = Some(PathBuf::from(path)),
            _ => return false,
        }
        view.error = None;
        true
    }

    fn execute_history(&mut self, command: Command, jobs: &Jobs) -> bool {
        let tab = self.history_view.tab;
        match command {
            Command::Filter(filter) => {
                let mut filters = self.history_view.state.filters.clone();
                match filter {
                    FilterCommand::Status(status) => filters.status = status,
                    FilterCommand::Model(model) => filters.model = model,
                    FilterCommand::From(date) => filters.start_date = date,
                    FilterCommand::To(date) => filters.end_date = date,
                    FilterCommand::Edited(on) => filters.is_edited = on,
                    FilterCommand::Success(on) => filters.only_success = on,
                }
                match self.services.history.set_filters(tab, filters) {
                    Ok(true) => {
                        self.history_view.selected = None;
                        self.fetch_history(jobs, false);
                    }
                    Ok(false) => self.sync_history(),
                    Err(err) => self.history_view.state.error = Some(err.to_string()),
                }
            }
            Command::ShareGroup(group_id) => match self.history_view.selected_row() {
                Some(row) => {
                    jobs.share_to_group(&self.services, tab.media_kind(), row.clone(), group_id)
                }
                None => self.history_view.state.error = Some("Select an item to share.".into()),
            },
            Command::ShareProject(project_id) => match self.history_view.selected_row() {
                Some(row) => jobs.share_to_project(&self.services, row.clone(), project_id),
                None => self.history_view.state.error = Some("Select an item to share.".into()),
            },
            command @ (Command::Clip { .. } | Command::Dub(_) | Command::Upscale(_)) => {
                let uri = if tab == HistoryTab::Video {
                    self.history_view.selected_row().and_then(HistoryRow::primary_gcs_uri)
                } else {
                    None
                };
                return self.post_process(uri, command, jobs);
            }
            _ => return false,
        }
        true
    }

    /// Clip, dub or upscale the video at `gcs_uri`.
    fn post_process(&mut self, gcs_uri: Option<String>, command: Command, jobs: &Jobs) -> bool {
        let Some(gcs_uri) = gcs_uri else {
            self.set_view_error("Select a video first.".into());
            return true;
        };
        match command {
            Command::Clip { start, end } => {
                let request = ClipRequest {
                    gcs_uri,
                    start_time: start,
                    end_time: end,
                };
                if let Err(err) = request.validate() {
                    self.set_view_error(err.to_string());
                    return true;
                }
                jobs.clip(&self.services, request);
            }
            Command::Dub(text) => jobs.dub(&self.services, DubRequest { gcs_uri, text }),
            Command::Upscale(resolution) => {
                jobs.upscale(&self.services, UpscaleRequest { gcs_uri, resolution })
            }
            _ => return false,
        }
        self.notify(NotificationLevel::Info, "Processing video…");
        true
    }

    fn execute_graph(&mut self, command: Command, jobs: &Jobs) -> bool {
        let selected = self.graph_view.selected;
        let result = match command {
            Command::AddVideo(target) => {
                jobs.add_video_node(&self.services, target);
                return true;
            }
            Command::Time(seconds) => {
                self.graph_view.capture_time = seconds;
                return true;
            }
            Command::Connect => match (self.graph_view.marked, selected) {
                (Some(source), Some(target)) => self
                    .services
                    .graph
                    .connect(source, target)
                    .map(|_| self.graph_view.marked = None),
                _ => {
                    self.graph_view.error =
                        Some("Mark a source with space, then select the target.".into());
                    return true;
                }
            },
            Command::Prompt(text) => match selected {
                Some(id) => self.services.graph.update_node_prompt(id, &text),
                None => return self.no_node_selected(),
            },
            command @ (Command::Model(_)
            | Command::Aspect(_)
            | Command::Duration(_)
            | Command::Samples(_)
            | Command::Resolution(_)
            | Command::Audio(_)
            | Command::Enhance(_)) => {
                let Some(node) = selected.and_then(|id| self.graph_view.graph.node(id)) else {
                    return self.no_node_selected();
                };
                let id = node.id;
                let mut params = node.data.params.clone();
                match command {
                    Command::Model(model) => params.model = model,
                    Command::Aspect(ratio) => params.aspect_ratio = ratio,
                    Command::Duration(seconds) => params.duration = seconds,
                    Command::Samples(count) => params.sample_count = count,
                    Command::Resolution(resolution) => params.resolution = resolution,
                    Command::Audio(on) => params.generate_audio = on,
                    Command::Enhance(on) => params.enhance_prompt = on,
                    _ => {}
                }
                if let Err(err) = params.validate() {
                    self.graph_view.error = Some(err.to_string());
                    return true;
                }
                self.services.graph.update_node_params(id, params)
            }
            _ => return false,
        };
        self.graph_view.error = result.err().map(|e| e.to_string());
        self.sync_graph();
        true
    }

    fn no_node_selected(&mut self) -> bool {
        self.graph_view.error = Some("Select a node first.".into());
        true
    }

    fn execute_collection(&mut self, collection: Collection, command: Command, jobs: &Jobs) -> bool {
        let selected_id = match collection {
            Collection::Project => self.projects_view.selected_project().map(|p| p.id.clone()),
            Collection::Group => self.groups_view.selected_group().map(|g| g.id.clone()),
        };
        let add = matches!(command, Command::AddMembers(_));
        match command {
            Command::Create(name) => jobs.create(&self.services, collection, name),
            Command::Import(path) => jobs.import(&self.services, collection, PathBuf::from(path)),
            Command::AddMembers(text) | Command::RemoveMembers(text) => {
                let Some(id) = selected_id else {
                    self.set_view_error(format!("Select a {} first.", collection.label()));
                    return true;
                };
                jobs.edit_members(&self.services, collection, id, text, add);
            }
            Command::Quota { quota, all: true } if collection == Collection::Project => {
                let entries: Vec<ProjectConfigEntry> = self
                    .projects_view
                    .projects
                    .iter()
                    .map(|p| ProjectConfigEntry {
                        project_id: p.id.clone(),
                        config: ProjectConfig {
                            unrestricted: false,
                            quota: quota.clone(),
                        },
                    })
                    .collect();
                jobs.save_project_configs(&self.services, entries);
            }
            Command::Quota { quota, all: false } if collection == Collection::Project => {
                let Some(id) = selected_id else {
                    self.set_view_error("Select a project first.".into());
                    return true;
                };
                let mut config = self.projects_view.config.clone().unwrap_or_default();
                config.quota = quota;
                self.projects_view.config = Some(config.clone());
                jobs.save_project_config(&self.services, id, config);
            }
            Command::Unrestricted(on) if collection == Collection::Project => {
                let Some(id) = selected_id else {
                    self.set_view_error("Select a project first.".into());
                    return true;
                };
                let mut config = self.projects_view.config.clone().unwrap_or_default();
                config.unrestricted = on;
                self.projects_view.config = Some(config.clone());
                jobs.save_project_config(&self.services, id, config);
            }
            _ => return false,
        }
        true
    }

    fn execute_analytics(&mut self, command: Command, jobs: &Jobs) -> bool {
        match command {
            Command::Filter(FilterCommand::From(date)) => self.analytics_view.range.start_date = date,
            Command::Filter(FilterCommand::To(date)) => self.analytics_view.range.end_date = date,
            _ => return false,
        }
        if !self.analytics_view.range.is_valid() {
            self.analytics_view.error = Some("Start date must not be after end date.".into());
            return true;
        }
        self.fetch_analytics(jobs);
        true
    }

    fn execute_configurations(&mut self, command: Command, jobs: &Jobs) -> bool {
        let view = &mut self.configurations_view;
        match command {
            Command::Set { key, value } => match view.document.as_mut().and_then(Value::as_object_mut) {
                Some(document) => {
                    document.insert(key, value);
                    view.dirty = true;
                    view.error = None;
                }
                None => view.error = Some("Configurations are not loaded yet.".into()),
            },
            Command::Save => match view.document.clone() {
                Some(document) => jobs.save_configurations(&self.services, document),
                None => view.error = Some("Configurations are not loaded yet.".into()),
            },
            _ => return false,
        }
        true
    }

    fn execute_prompts(&mut self, command: Command, jobs: &Jobs) -> bool {
        match command {
            Command::SavePrompt { text, keywords } => jobs.save_prompt(&self.services, text, keywords),
            Command::Tags(tags) => {
                self.prompts_view.tags = tags;
                self.prompts_view.page_number = 1;
                self.fetch_prompts(jobs);
            }
            _ => return false,
        }
        true
    }

    // ------------------------------------------------------------------------
    // Job results
    // ------------------------------------------------------------------------

    pub fn apply(&mut self, result: WorkResult, jobs: &Jobs) {
        match result {
            WorkResult::Session { user, banner } => {
                match user {
                    Ok(user) => {
                        tracing::info!(user = %user.display_name(), admin = user.is_admin(), "session loaded");
                        self.user = Some(user);
                    }
                    Err(err) => self.notify(NotificationLevel::Warning, format!("Not signed in: {}", err)),
                }
                if let Some(banner) = banner {
                    if let Some(message) = banner.messages.first() {
                        self.notifications.push(
                            Notification::new(NotificationLevel::Info, message.clone())
                                .dismissable(),
                        );
                    }
                    self.banner = banner.messages;
                }
            }
            WorkResult::Video(result) => {
                self.generate_view.running = None;
                match result {
                    Ok(outcome) => self.apply_video_outcome(outcome),
                    Err(err) => self.generate_view.error = Some(err),
                }
            }
            WorkResult::Image(result) => {
                self.image_view.running = None;
                match result {
                    Ok(outcome) => self.apply_image_outcome(outcome),
                    Err(err) => self.image_view.error = Some(err),
                }
            }
            WorkResult::Chain { source, result } => {
                self.finish_chain(source);
                match result {
                    Ok(Some(node)) => {
                        self.graph_view.selected = Some(node);
                        self.notify(NotificationLevel::Success, "Next clip generated.");
                    }
                    Ok(None) => {}
                    Err(err) => self.graph_view.error = Some(err),
                }
            }
            WorkResult::Cancelled(kind) => {
                match kind {
                    JobKind::Video => self.generate_view.running = None,
                    JobKind::Image => self.image_view.running = None,
                    JobKind::Chain(source) => self.finish_chain(source),
                }
                self.notify(NotificationLevel::Info, "Generation cancelled.");
            }
            WorkResult::GraphChanged => self.sync_graph(),
            WorkResult::History { tab, result } => {
                if tab == self.history_view.tab {
                    self.history_view.loading = false;
                    self.sync_history();
                    if let Err(err) = result {
                        self.history_view.state.error = Some(err);
                    }
                }
            }
            WorkResult::Processed(result) => match result {
                Ok(processed) => {
                    self.notify(
                        NotificationLevel::Success,
                        format!("Processed video ready: {}", processed.processed_video_uri),
                    );
                    self.generate_view.processed = Some(processed);
                }
                Err(err) => self.set_view_error(err),
            },
            WorkResult::UpscaleJobs(result) => match result {
                Ok(jobs_list) => self.generate_view.upscale_jobs = jobs_list,
                Err(err) => self.set_view_error(err),
            },
            WorkResult::Projects(result) => match result {
                Ok(projects) => {
                    let len = projects.len();
                    self.projects_view.projects = projects;
                    self.projects_view.selected = clamp_selection(self.projects_view.selected, len);
                    self.projects_view.error = None;
                }
                Err(err) => self.projects_view.error = Some(err),
            },
            WorkResult::ProjectDetail {
                project_id,
                config,
                assets,
            } => {
                let current = self.projects_view.selected_project().map(|p| p.id.as_str());
                if current == Some(project_id.as_str()) {
                    let mut errors = Vec::new();
                    match config {
                        Ok(config) => self.projects_view.config = Some(config),
                        Err(err) => errors.push(err),
                    }
                    match assets {
                        Ok(assets) => self.projects_view.assets = assets,
                        Err(err) => errors.push(err),
                    }
                    self.projects_view.error = (!errors.is_empty()).then(|| errors.join(" "));
                }
            }
            WorkResult::Groups(result) => match result {
                Ok(groups) => {
                    let len = groups.len();
                    self.groups_view.groups = groups;
                    self.groups_view.selected = clamp_selection(self.groups_view.selected, len);
                    self.groups_view.error = None;
                }
                Err(err) => self.groups_view.error = Some(err),
            },
            WorkResult::GroupItems { group_id, result } => {
                let current = self.groups_view.selected_group().map(|g| g.id.as_str());
                if current == Some(group_id.as_str()) {
                    match result {
                        Ok(items) => {
                            let len = items.len();
                            self.groups_view.items = items;
                            self.groups_view.item_selected =
                                clamp_selection(self.groups_view.item_selected, len);
                            if len == 0 {
                                self.groups_view.focus_items = false;
                            }
                        }
                        Err(err) => self.groups_view.error = Some(err),
                    }
                }
            }
            WorkResult::Analytics(result) => {
                self.analytics_view.loading = false;
                match result {
                    Ok((report, by_project)) => {
                        self.analytics_view.report = Some(report);
                        self.analytics_view.by_project = Some(by_project);
                        self.analytics_view.error = None;
                    }
                    Err(err) => self.analytics_view.error = Some(err),
                }
            }
            WorkResult::Configurations(result) => match result {
                Ok(document) => {
                    self.configurations_view.document = Some(document);
                    self.configurations_view.dirty = false;
                    self.configurations_view.error = None;
                }
                Err(err) => self.configurations_view.error = Some(err),
            },
            WorkResult::Prompts(result) => match result {
                Ok(page) => {
                    let len = page.rows.len();
                    self.prompts_view.page = page;
                    self.prompts_view.selected = clamp_selection(self.prompts_view.selected, len);
                    self.prompts_view.error = None;
                }
                Err(err) => self.prompts_view.error = Some(err),
            },
            WorkResult::Saved { label, result } => match result {
                Ok(()) => {
                    self.notify(NotificationLevel::Success, label);
                    if self.active_view == View::Configurations {
                        self.configurations_view.dirty = false;
                    }
                    self.refresh(jobs);
                    if self.active_view == View::Projects || self.active_view == View::Groups {
                        self.confirm(jobs);
                    }
                }
                Err(err) => self.set_view_error(err),
            },
        }
    }

    fn apply_video_outcome(&mut self, outcome: VideoOutcome) {
        if !outcome.rai_reasons.is_empty() {
            self.notify(NotificationLevel::Warning, rai_summary(&outcome.rai_reasons));
        }
        if let Some(revised) = &outcome.revised_prompt {
            tracing::debug!(revised_prompt = %revised, "prompt was rewritten");
        }
        self.generate_view.error = match (&outcome.error, outcome.videos.is_empty()) {
            (Some(err), true) => Some(err.clone()),
            _ => None,
        };
        self.generate_view.selected = (!outcome.videos.is_empty()).then_some(0);
        if !outcome.videos.is_empty() {
            self.notify(
                NotificationLevel::Success,
                format!("{} video(s) generated.", outcome.videos.len()),
            );
        }
        self.generate_view.outcome = Some(outcome);
    }

    fn apply_image_outcome(&mut self, outcome: ImageOutcome) {
        if !outcome.rai_reasons.is_empty() {
            self.notify(NotificationLevel::Warning, rai_summary(&outcome.rai_reasons));
        }
        self.image_view.error = match (&outcome.error, outcome.images.is_empty()) {
            (Some(err), true) => Some(err.clone()),
            _ => None,
        };
        self.image_view.selected = (!outcome.images.is_empty()).then_some(0);
        self.image_view.outcome = Some(outcome);
    }

    fn finish_chain(&mut self, source: NodeId) {
        if let Some(index) = self
            .graph_view
            .running
            .iter()
            .position(|(id, _)| *id == source)
        {
            self.graph_view.running.remove(index);
        }
        self.sync_graph();
    }
}

fn rai_summary(reasons: &[RaiReason]) -> String {
    let details: Vec<&str> = reasons
        .iter()
        .map(|r| {
            if r.description.is_empty() {
                r.code.as_str()
            } else {
                r.description.as_str()
            }
        })
        .collect();
    format!("Blocked by content filters: {}", details.join("; "))
}

fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
    match selected {
        _ if len == 0 => None,
        Some(i) if i < len => Some(i),
        _ => Some(0),
    }
}

fn select_next_index(len: usize, selected: &mut Option<usize>) {
    if len == 0 {
        *selected = None;
        return;
    }
    *selected = Some(match *selected {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    });
}

fn select_prev_index(len: usize, selected: &mut Option<usize>) {
    if len == 0 {
        *selected = None;
        return;
    }
    *selected = Some(match *selected {
        Some(i) if i > 0 && i < len => i - 1,
        _ => len - 1,
    });
}
