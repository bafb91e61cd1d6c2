//! Project list screen controller.
//!
//! Holds the transient local view of the remote project collection plus the
//! editor/error state of the screen. Every successful mutation is reconciled
//! with a full re-read of the collection. Loads are tagged with a sequence
//! number so a response that settles after a newer load was issued is dropped.

use std::sync::Arc;

use shared::{
    domain::{Project, ProjectId},
    protocol::ProjectRouteState,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::error_to_string,
    graphql::ProjectRepository,
    navigation::{Navigator, Route},
};

pub const LOAD_ERROR_MESSAGE: &str = "There was an error loading the data.";
pub const EMPTY_LIST_MESSAGE: &str = "No projects available.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenViewState {
    pub modal_open: bool,
    pub selected_project: Option<Project>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Creating,
    Editing(Project),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenView {
    /// First load still in flight.
    Loading,
    /// The list could not be read; the only way forward is [`ProjectScreen::retry`].
    LoadFailed { message: String },
    Ready {
        projects: Vec<Project>,
        error_message: Option<String>,
        editor: EditorState,
    },
}

impl ScreenView {
    pub fn empty_state(&self) -> Option<&'static str> {
        match self {
            ScreenView::Ready { projects, .. } if projects.is_empty() => Some(EMPTY_LIST_MESSAGE),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ScreenState {
    projects: Option<Vec<Project>>,
    loading: bool,
    load_error: Option<String>,
    view: ScreenViewState,
    issued_loads: u64,
}

impl ScreenState {
    fn editor(&self) -> EditorState {
        match (&self.view.modal_open, &self.view.selected_project) {
            (false, _) => EditorState::Closed,
            (true, Some(project)) => EditorState::Editing(project.clone()),
            (true, None) => EditorState::Creating,
        }
    }
}

pub struct ProjectScreen {
    repository: Arc<dyn ProjectRepository>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<ScreenState>,
}

impl ProjectScreen {
    pub fn new(repository: Arc<dyn ProjectRepository>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            repository,
            navigator,
            state: Mutex::new(ScreenState::default()),
        }
    }

    pub async fn view(&self) -> ScreenView {
        let guard = self.state.lock().await;
        if guard.loading && guard.projects.is_none() {
            return ScreenView::Loading;
        }
        if let Some(message) = &guard.load_error {
            return ScreenView::LoadFailed {
                message: message.clone(),
            };
        }
        ScreenView::Ready {
            projects: guard.projects.clone().unwrap_or_default(),
            error_message: guard.view.error_message.clone(),
            editor: guard.editor(),
        }
    }

    pub async fn view_state(&self) -> ScreenViewState {
        self.state.lock().await.view.clone()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.state.lock().await.projects.clone().unwrap_or_default()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn error_message(&self) -> Option<String> {
        self.state.lock().await.view.error_message.clone()
    }

    /// Reads the whole collection. Only the most recently issued load may
    /// update the list.
    pub async fn load_projects(&self) {
        let sequence = {
            let mut guard = self.state.lock().await;
            guard.issued_loads += 1;
            guard.loading = true;
            guard.issued_loads
        };

        let result = self.repository.list_projects().await;

        let mut guard = self.state.lock().await;
        if sequence != guard.issued_loads {
            warn!(
                sequence,
                latest = guard.issued_loads,
                "discarding stale project list response"
            );
            return;
        }
        guard.loading = false;
        match result {
            Ok(projects) => {
                info!(count = projects.len(), "project list loaded");
                guard.projects = Some(projects);
                guard.load_error = None;
            }
            Err(err) => {
                warn!(error = %err, "failed to load project list");
                guard.load_error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }
    }

    pub async fn retry(&self) {
        self.load_projects().await;
    }

    /// Returns whether the data service accepted the new project.
    pub async fn create_project(&self, name: &str, description: &str) -> bool {
        match self.repository.create_project(name, description).await {
            Ok(project) => {
                info!(project_id = %project.id, "project created");
                self.load_projects().await;
                self.clear_error().await;
                true
            }
            Err(err) => {
                self.record_error("create", &err).await;
                false
            }
        }
    }

    pub async fn update_project(&self, id: &ProjectId, name: &str, description: &str) -> bool {
        match self.repository.update_project(id, name, description).await {
            Ok(project) => {
                info!(project_id = %project.id, "project updated");
                self.load_projects().await;
                self.clear_error().await;
                true
            }
            Err(err) => {
                self.record_error("update", &err).await;
                false
            }
        }
    }

    /// A failed delete leaves the list as it was; an earlier error message
    /// survives a successful delete.
    pub async fn delete_project(&self, id: &ProjectId) -> bool {
        match self.repository.delete_project(id).await {
            Ok(()) => {
                info!(project_id = %id, "project deleted");
                self.load_projects().await;
                true
            }
            Err(err) => {
                self.record_error("delete", &err).await;
                false
            }
        }
    }

    pub async fn open_creator(&self) {
        let mut guard = self.state.lock().await;
        guard.view.selected_project = None;
        guard.view.modal_open = true;
    }

    pub async fn select_for_edit(&self, project: Project) {
        let mut guard = self.state.lock().await;
        guard.view.selected_project = Some(project);
        guard.view.modal_open = true;
    }

    pub async fn close_editor(&self) {
        let mut guard = self.state.lock().await;
        guard.view.selected_project = None;
        guard.view.modal_open = false;
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.view.error_message = None;
    }

    pub fn open_project(&self, project: &Project) {
        self.navigator
            .navigate(Route::ProjectPeriods(ProjectRouteState {
                period_project_id: project.id.to_string(),
                project_name: project.name.clone(),
            }));
    }

    async fn record_error(&self, action: &'static str, err: &anyhow::Error) {
        warn!(action, error = %err, "project mutation failed");
        self.state.lock().await.view.error_message = Some(error_to_string(err));
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
