//! Background jobs.
//!
//! Every network call the UI makes runs on a spawned task and reports back
//! through the event channel as a [`WorkResult`]. Long-running jobs take a
//! cancellation token that is a child of the app's shutdown token.

use crate::events::{JobKind, TuiEvent, WorkResult};
use crate::state::Services;
use atelier_client::WorkflowError;
use atelier_core::{
    parse_import_csv, parse_member_emails, ClipRequest, DateRange, DubRequest, HistoryRow,
    HistoryTab, ImageEnrichmentRequest, ImageGenerationRequest, ImageImitationRequest,
    LocalMedia, MediaKind, NewCollection, NewPrompt, NodeId, ProjectConfig, ProjectConfigEntry,
    UpscaleRequest, VideoGenerationRequest,
};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Which collection a membership job targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Project,
    Group,
}

impl Collection {
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Project => "project",
            Collection::Group => "group",
        }
    }
}

/// Image job, resolved from the image form.
#[derive(Debug, Clone)]
pub enum ImageJob {
    Generate(ImageGenerationRequest),
    Enrich {
        source: PathBuf,
        request: ImageEnrichmentRequest,
    },
    Imitate {
        source: PathBuf,
        request: ImageImitationRequest,
    },
}

#[derive(Clone)]
pub struct Jobs {
    sender: mpsc::Sender<TuiEvent>,
}

impl Jobs {
    pub fn new(sender: mpsc::Sender<TuiEvent>) -> Self {
        Self { sender }
    }

    fn spawn<F>(&self, job: F)
    where
        F: Future<Output = WorkResult> + Send + 'static,
    {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = job.await;
            if sender.send(TuiEvent::Work(Box::new(result))).await.is_err() {
                tracing::debug!("event loop gone, dropping job result");
            }
        });
    }

    pub fn load_session(&self, services: &Services) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let user = rest.current_user().await.map_err(|e| e.to_string());
            let banner = match rest.notification_banner().await {
                Ok(banner) => Some(banner),
                Err(err) => {
                    tracing::warn!(error = %err, "notification banner unavailable");
                    None
                }
            };
            WorkResult::Session { user, banner }
        });
    }

    pub fn generate_video(
        &self,
        services: &Services,
        request: VideoGenerationRequest,
        cancel: CancellationToken,
    ) {
        let workflow = services.workflow.clone();
        self.spawn(async move {
            match workflow.generate_video(&request, &cancel).await {
                Err(err) if err.is_cancelled() => WorkResult::Cancelled(JobKind::Video),
                result => WorkResult::Video(result.map_err(|e| e.to_string())),
            }
        });
    }

    pub fn generate_image(&self, services: &Services, job: ImageJob, cancel: CancellationToken) {
        let workflow = services.workflow.clone();
        self.spawn(async move {
            let result = match job {
                ImageJob::Generate(request) => workflow.generate_image(&request, &cancel).await,
                ImageJob::Enrich { source, request } => match read_media(source).await {
                    Ok(file) => workflow.enrich_image(&file, &request, &cancel).await,
                    Err(err) => Err(err),
                },
                ImageJob::Imitate { source, request } => match read_media(source).await {
                    Ok(file) => workflow.imitate_image(&file, &request, &cancel).await,
                    Err(err) => Err(err),
                },
            };
            match result {
                Err(err) if err.is_cancelled() => WorkResult::Cancelled(JobKind::Image),
                result => WorkResult::Image(result.map_err(|e| e.to_string())),
            }
        });
    }

    pub fn chain_generation(
        &self,
        services: &Services,
        source: NodeId,
        start_time: f64,
        cancel: CancellationToken,
    ) {
        let chain = services.chain.clone();
        self.spawn(async move {
            match chain
                .trigger_generation(source, None, start_time, &cancel)
                .await
            {
                Err(err) if err.is_cancelled() => WorkResult::Cancelled(JobKind::Chain(source)),
                result => WorkResult::Chain {
                    source,
                    result: result.map_err(|e| e.to_string()),
                },
            }
        });
    }

    /// Add a graph node from a local video file or a hosted URL.
    pub fn add_video_node(&self, services: &Services, target: String) {
        let graph = services.graph.clone();
        self.spawn(async move {
            let position = next_root_position(&graph);
            let result = if target.starts_with("http://") || target.starts_with("https://") {
                graph
                    .add_remote_video_node(&target, position, None)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            } else {
                graph
                    .add_video_file(std::path::Path::new(&target), position)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            };
            match result {
                Ok(()) => WorkResult::GraphChanged,
                Err(err) => WorkResult::Saved {
                    label: "Add video".into(),
                    result: Err(err),
                },
            }
        });
    }

    pub fn fetch_history(&self, services: &Services, tab: HistoryTab, force: bool) {
        let history = services.history.clone();
        self.spawn(async move {
            let result = history.fetch(tab, force).await;
            WorkResult::History {
                tab,
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn refresh_history(&self, services: &Services, tab: HistoryTab) {
        let history = services.history.clone();
        self.spawn(async move {
            let result = history.refresh(tab).await;
            WorkResult::History {
                tab,
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn clear_history_filters(&self, services: &Services, tab: HistoryTab) {
        let history = services.history.clone();
        self.spawn(async move {
            let result = history.clear_filters(tab).await;
            WorkResult::History {
                tab,
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn clip(&self, services: &Services, request: ClipRequest) {
        let rest = services.rest.clone();
        self.spawn(async move {
            WorkResult::Processed(rest.edit_video(&request).await.map_err(|e| e.to_string()))
        });
    }

    pub fn dub(&self, services: &Services, request: DubRequest) {
        let rest = services.rest.clone();
        self.spawn(async move {
            WorkResult::Processed(rest.dub_video(&request).await.map_err(|e| e.to_string()))
        });
    }

    pub fn upscale(&self, services: &Services, request: UpscaleRequest) {
        let rest = services.rest.clone();
        self.spawn(async move {
            if let Err(err) = rest.upscale_video(&request).await {
                return WorkResult::UpscaleJobs(Err(err.to_string()));
            }
            WorkResult::UpscaleJobs(rest.upscale_jobs().await.map_err(|e| e.to_string()))
        });
    }

    pub fn upscale_jobs(&self, services: &Services) {
        let rest = services.rest.clone();
        self.spawn(async move {
            WorkResult::UpscaleJobs(rest.upscale_jobs().await.map_err(|e| e.to_string()))
        });
    }

    pub fn share_to_group(&self, services: &Services, kind: MediaKind, row: HistoryRow, group_id: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.share_to_group(kind, &row, &group_id).await;
            WorkResult::Saved {
                label: "Shared to group".into(),
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn share_to_project(&self, services: &Services, row: HistoryRow, project_id: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.share_to_project(&row, &project_id).await;
            WorkResult::Saved {
                label: "Added to project".into(),
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn list_projects(&self, services: &Services) {
        let rest = services.rest.clone();
        self.spawn(async move {
            WorkResult::Projects(rest.list_projects().await.map_err(|e| e.to_string()))
        });
    }

    pub fn project_detail(&self, services: &Services, project_id: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let config = rest
                .project_config(&project_id)
                .await
                .map_err(|e| e.to_string());
            let assets = rest
                .project_assets(&project_id)
                .await
                .map_err(|e| e.to_string());
            WorkResult::ProjectDetail {
                project_id,
                config,
                assets,
            }
        });
    }

    pub fn save_project_config(&self, services: &Services, project_id: String, config: ProjectConfig) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = match config.validate() {
                Ok(()) => rest
                    .save_project_config(&project_id, &config)
                    .await
                    .map_err(|e| e.to_string()),
                Err(err) => Err(err.to_string()),
            };
            WorkResult::Saved {
                label: "Project configuration saved".into(),
                result,
            }
        });
    }

    pub fn save_project_configs(&self, services: &Services, entries: Vec<ProjectConfigEntry>) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let invalid = entries.iter().find_map(|e| e.config.validate().err());
            let result = match invalid {
                Some(err) => Err(err.to_string()),
                None => rest
                    .save_project_configs(&entries)
                    .await
                    .map_err(|e| e.to_string()),
            };
            WorkResult::Saved {
                label: "Project configurations saved".into(),
                result,
            }
        });
    }

    pub fn list_groups(&self, services: &Services) {
        let rest = services.rest.clone();
        self.spawn(async move {
            WorkResult::Groups(rest.list_groups().await.map_err(|e| e.to_string()))
        });
    }

    pub fn group_items(&self, services: &Services, group_id: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.group_items(&group_id).await.map_err(|e| e.to_string());
            WorkResult::GroupItems { group_id, result }
        });
    }

    pub fn delete_shared_item(&self, services: &Services, item_id: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.delete_shared_item(&item_id).await;
            WorkResult::Saved {
                label: "Shared item removed".into(),
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn create(&self, services: &Services, collection: Collection, name: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = match NewCollection::new(&name) {
                Ok(request) => {
                    let created = match collection {
                        Collection::Project => rest.create_project(&request).await,
                        Collection::Group => rest.create_group(&request).await,
                    };
                    created.map_err(|e| e.to_string())
                }
                Err(err) => Err(err.to_string()),
            };
            WorkResult::Saved {
                label: format!("Created {} {}", collection.label(), name.trim()),
                result,
            }
        });
    }

    /// Add or remove members. One address goes through the single-member
    /// endpoint, several through the bulk one.
    pub fn edit_members(
        &self,
        services: &Services,
        collection: Collection,
        id: String,
        text: String,
        add: bool,
    ) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = async {
                let emails = parse_member_emails(&text).map_err(|e| e.to_string())?;
                let outcome = match (collection, add, emails.as_slice()) {
                    (_, _, []) => return Err("No email addresses given.".to_string()),
                    (Collection::Project, true, [one]) => rest.add_project_member(&id, one).await,
                    (Collection::Project, false, [one]) => {
                        rest.remove_project_member(&id, one).await
                    }
                    (Collection::Group, true, [one]) => rest.add_group_member(&id, one).await,
                    (Collection::Group, false, [one]) => rest.remove_group_member(&id, one).await,
                    (Collection::Project, true, many) => {
                        rest.bulk_add_project_members(&id, many).await
                    }
                    (Collection::Project, false, many) => {
                        rest.bulk_remove_project_members(&id, many).await
                    }
                    (Collection::Group, true, many) => rest.bulk_add_group_members(&id, many).await,
                    (Collection::Group, false, many) => {
                        rest.bulk_remove_group_members(&id, many).await
                    }
                };
                outcome.map_err(|e| e.to_string())
            }
            .await;
            let verb = if add { "added" } else { "removed" };
            WorkResult::Saved {
                label: format!("Members {}", verb),
                result,
            }
        });
    }

    pub fn import(&self, services: &Services, collection: Collection, path: PathBuf) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = async {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                let entries = parse_import_csv(&text).map_err(|e| e.to_string())?;
                let imported = match collection {
                    Collection::Project => rest.import_projects(entries).await,
                    Collection::Group => rest.import_groups(entries).await,
                };
                imported.map_err(|e| e.to_string())
            }
            .await;
            WorkResult::Saved {
                label: format!("Imported {}s", collection.label()),
                result,
            }
        });
    }

    pub fn analytics(&self, services: &Services, range: DateRange) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = async {
                if !range.is_valid() {
                    return Err("Start date must not be after end date.".to_string());
                }
                let report = rest.consumption(&range).await.map_err(|e| e.to_string())?;
                let by_project = rest
                    .consumption_by_project(&range)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok((report, by_project))
            }
            .await;
            WorkResult::Analytics(result)
        });
    }

    pub fn configurations(&self, services: &Services) {
        let rest = services.rest.clone();
        self.spawn(async move {
            WorkResult::Configurations(rest.configurations().await.map_err(|e| e.to_string()))
        });
    }

    pub fn save_configurations(&self, services: &Services, document: Value) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.save_configurations(&document).await;
            WorkResult::Saved {
                label: "Configurations saved".into(),
                result: result.map_err(|e| e.to_string()),
            }
        });
    }

    pub fn list_prompts(&self, services: &Services, tags: Option<String>, page: u32, page_size: u32) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.list_prompts(tags.as_deref(), page, page_size).await;
            WorkResult::Prompts(result.map_err(|e| e.to_string()))
        });
    }

    pub fn save_prompt(&self, services: &Services, text: String, keywords: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = match NewPrompt::new(&text, &keywords) {
                Ok(prompt) => rest.save_prompt(&prompt).await.map_err(|e| e.to_string()),
                Err(err) => Err(err.to_string()),
            };
            WorkResult::Saved {
                label: "Prompt saved".into(),
                result,
            }
        });
    }

    pub fn delete_prompt(&self, services: &Services, prompt_id: String) {
        let rest = services.rest.clone();
        self.spawn(async move {
            let result = rest.delete_prompt(&prompt_id).await;
            WorkResult::Saved {
                label: "Prompt deleted".into(),
                result: result.map_err(|e| e.to_string()),
            }
        });
    }
}

async fn read_media(path: PathBuf) -> Result<LocalMedia, WorkflowError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(LocalMedia::new(name, bytes))
}

/// Stack new root nodes below the existing ones.
fn next_root_position(graph: &atelier_client::SharedGraph) -> atelier_core::Position {
    let lowest = graph
        .snapshot()
        .ok()
        .and_then(|g| {
            g.nodes()
                .iter()
                .map(|n| n.position.y)
                .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))))
        });
    match lowest {
        Some(y) => atelier_core::Position::new(10.0, y + 300.0),
        None => atelier_core::Position::new(10.0, 20.0),
    }
}
