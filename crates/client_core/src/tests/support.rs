//! In-memory stand-ins for the identity provider, the project data service
//! and the navigator.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{AuthUser, Project, ProjectId, UserId},
    error::{GraphqlErrorItem, ProviderError},
    protocol::{ConfirmSignInInput, SignInInput, SignInOutput, SignInStep},
};
use tokio::sync::oneshot;

use crate::{
    error::DataRequestError,
    graphql::ProjectRepository,
    identity::IdentityProvider,
    navigation::{Navigator, Route},
};

pub fn user(username: &str) -> AuthUser {
    AuthUser {
        user_id: UserId(format!("sub-{username}")),
        username: username.to_string(),
        attributes: Default::default(),
    }
}

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: ProjectId::new(id),
        name: name.to_string(),
        description: format!("{name} description"),
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp"),
        image: format!("https://images.example/{id}.png"),
    }
}

#[derive(Default)]
pub struct FakeIdentityState {
    pub signed_in: Option<AuthUser>,
    pub pending_user: Option<AuthUser>,
    pub challenge: Option<SignInStep>,
    pub fail_current_user_with: Option<String>,
    pub fail_sign_in_with: Option<ProviderError>,
    pub fail_confirm_with: Option<ProviderError>,
    pub fail_sign_out_with: Option<ProviderError>,
    pub current_user_calls: u32,
    pub confirmations: Vec<ConfirmSignInInput>,
}

#[derive(Default)]
pub struct FakeIdentityProvider {
    state: Mutex<FakeIdentityState>,
}

impl FakeIdentityProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn configure(&self, f: impl FnOnce(&mut FakeIdentityState)) {
        f(&mut self.state.lock().expect("fake identity state"));
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&FakeIdentityState) -> T) -> T {
        f(&self.state.lock().expect("fake identity state"))
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn get_current_user(&self) -> Result<AuthUser> {
        let mut state = self.state.lock().expect("fake identity state");
        state.current_user_calls += 1;
        if let Some(err) = &state.fail_current_user_with {
            return Err(anyhow!(err.clone()));
        }
        state.signed_in.clone().ok_or_else(|| {
            ProviderError::new("UserUnAuthenticatedException", "User needs to be authenticated")
                .into()
        })
    }

    async fn sign_in(&self, input: SignInInput) -> Result<SignInOutput> {
        let mut state = self.state.lock().expect("fake identity state");
        if let Some(err) = &state.fail_sign_in_with {
            return Err(err.clone().into());
        }
        if let Some(step) = state.challenge {
            state.pending_user = Some(user(&input.username));
            return Ok(SignInOutput::pending(step));
        }
        state.signed_in = Some(user(&input.username));
        Ok(SignInOutput::done())
    }

    async fn confirm_sign_in(&self, input: ConfirmSignInInput) -> Result<SignInOutput> {
        let mut state = self.state.lock().expect("fake identity state");
        if let Some(err) = &state.fail_confirm_with {
            return Err(err.clone().into());
        }
        state.confirmations.push(input);
        let pending = state.pending_user.take().ok_or_else(|| {
            ProviderError::new("NoPendingChallenge", "There is no sign-in challenge to confirm.")
        })?;
        state.signed_in = Some(pending);
        Ok(SignInOutput::done())
    }

    async fn sign_out(&self) -> Result<()> {
        let mut state = self.state.lock().expect("fake identity state");
        if let Some(err) = &state.fail_sign_out_with {
            return Err(err.clone().into());
        }
        state.signed_in = None;
        Ok(())
    }
}

pub type GatedList = oneshot::Receiver<Result<Vec<Project>, String>>;

#[derive(Default)]
pub struct FakeRepositoryState {
    pub projects: Vec<Project>,
    pub list_calls: u32,
    pub create_calls: u32,
    pub update_calls: u32,
    pub delete_calls: u32,
    pub fail_list_with: Option<String>,
    pub fail_create_with: Option<String>,
    pub fail_update_with: Option<String>,
    pub fail_delete_with: Option<String>,
    pub gated_lists: VecDeque<GatedList>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeRepository {
    state: Mutex<FakeRepositoryState>,
}

fn data_error(message: &str) -> anyhow::Error {
    DataRequestError::Graphql {
        messages: vec![GraphqlErrorItem {
            message: message.to_string(),
            error_type: None,
        }],
    }
    .into()
}

impl FakeRepository {
    pub fn with_projects(projects: Vec<Project>) -> Arc<Self> {
        let repository = Self::default();
        repository.configure(|state| state.projects = projects);
        Arc::new(repository)
    }

    pub fn configure(&self, f: impl FnOnce(&mut FakeRepositoryState)) {
        f(&mut self.state.lock().expect("fake repository state"));
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&FakeRepositoryState) -> T) -> T {
        f(&self.state.lock().expect("fake repository state"))
    }

    pub fn list_calls(&self) -> u32 {
        self.inspect(|state| state.list_calls)
    }

    /// Queues a list response that resolves only when the returned sender
    /// fires.
    pub fn gate_next_list(&self) -> oneshot::Sender<Result<Vec<Project>, String>> {
        let (tx, rx) = oneshot::channel();
        self.configure(|state| state.gated_lists.push_back(rx));
        tx
    }
}

#[async_trait]
impl ProjectRepository for FakeRepository {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let gate = {
            let mut state = self.state.lock().expect("fake repository state");
            state.list_calls += 1;
            if let Some(err) = &state.fail_list_with {
                return Err(data_error(err));
            }
            match state.gated_lists.pop_front() {
                Some(gate) => gate,
                None => return Ok(state.projects.clone()),
            }
        };

        match gate.await {
            Ok(Ok(projects)) => Ok(projects),
            Ok(Err(err)) => Err(data_error(&err)),
            Err(_) => Err(anyhow!("gated list response dropped")),
        }
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let mut state = self.state.lock().expect("fake repository state");
        state.create_calls += 1;
        if let Some(err) = &state.fail_create_with {
            return Err(data_error(err));
        }
        state.next_id += 1;
        let mut created = project(&format!("new-{}", state.next_id), name);
        created.description = description.to_string();
        state.projects.push(created.clone());
        Ok(created)
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        name: &str,
        description: &str,
    ) -> Result<Project> {
        let mut state = self.state.lock().expect("fake repository state");
        state.update_calls += 1;
        if let Some(err) = &state.fail_update_with {
            return Err(data_error(err));
        }
        let existing = state
            .projects
            .iter_mut()
            .find(|project| &project.id == id)
            .ok_or_else(|| data_error("project not found"))?;
        existing.name = name.to_string();
        existing.description = description.to_string();
        Ok(existing.clone())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        let mut state = self.state.lock().expect("fake repository state");
        state.delete_calls += 1;
        if let Some(err) = &state.fail_delete_with {
            return Err(data_error(err));
        }
        state.projects.retain(|project| &project.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().expect("navigator routes").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().expect("navigator routes").push(route);
    }
}
