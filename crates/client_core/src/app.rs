//! Application context: the explicitly constructed owner of the session
//! manager and the data boundary, handed to whichever front end needs them.

use std::sync::Arc;

use anyhow::{bail, Result};
use reqwest::Client;
use tracing::{info, warn};

use crate::{
    cognito::CognitoIdentityProvider,
    config::ClientSettings,
    graphql::{GraphqlClient, GraphqlProjectRepository, ProjectRepository},
    identity::{IdentityProvider, TokenSource},
    navigation::Navigator,
    screen::ProjectScreen,
    session::SessionManager,
};

pub struct AppContext {
    session: Arc<SessionManager>,
    repository: Arc<dyn ProjectRepository>,
}

impl AppContext {
    /// Wires the Cognito provider and the GraphQL repository from `settings`
    /// and resolves the session active at startup.
    pub async fn start(settings: &ClientSettings) -> Result<Self> {
        if settings.cognito_client_id.trim().is_empty() {
            bail!("cognito_client_id is not configured");
        }
        if settings.graphql_endpoint.trim().is_empty() {
            bail!("graphql_endpoint is not configured");
        }

        let http = Client::new();
        let cognito = Arc::new(CognitoIdentityProvider::new(
            http.clone(),
            settings.cognito_url(),
            settings.cognito_client_id.clone(),
        ));
        let tokens: Arc<dyn TokenSource> = Arc::clone(&cognito) as Arc<dyn TokenSource>;
        let repository = Arc::new(GraphqlProjectRepository::new(GraphqlClient::new(
            http,
            settings.graphql_endpoint.clone(),
            settings.graphql_api_key.clone(),
            tokens,
        )));

        info!(
            cognito = %settings.cognito_url(),
            graphql = %settings.graphql_endpoint,
            "starting application context"
        );
        Ok(Self::with_dependencies(cognito, repository).await)
    }

    pub async fn with_dependencies(
        identity: Arc<dyn IdentityProvider>,
        repository: Arc<dyn ProjectRepository>,
    ) -> Self {
        let session = SessionManager::new(identity);
        session.initialize().await;
        Self {
            session,
            repository,
        }
    }

    pub fn session(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    pub fn project_screen(&self, navigator: Arc<dyn Navigator>) -> ProjectScreen {
        ProjectScreen::new(Arc::clone(&self.repository), navigator)
    }

    /// Signs out a remaining session (best effort) and drops the context.
    pub async fn shutdown(self) {
        if self.session.is_authenticated().await {
            if let Err(err) = self.session.sign_out().await {
                warn!(error = %err, "sign-out during shutdown failed");
            }
        }
        info!("application context shut down");
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
