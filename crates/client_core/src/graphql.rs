//! GraphQL data boundary for project records.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use shared::{
    domain::{Project, ProjectId},
    error::GraphqlErrorItem,
};
use tracing::debug;

use crate::{error::DataRequestError, identity::TokenSource};

const PROJECT_FIELDS: &str = "id name description createdAt image";

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn create_project(&self, name: &str, description: &str) -> Result<Project>;
    async fn update_project(&self, id: &ProjectId, name: &str, description: &str)
        -> Result<Project>;
    async fn delete_project(&self, id: &ProjectId) -> Result<()>;
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorItem>,
}

#[derive(Deserialize)]
struct ErrorsOnly {
    #[serde(default)]
    errors: Vec<GraphqlErrorItem>,
}

pub struct GraphqlClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    tokens: Arc<dyn TokenSource>,
}

impl GraphqlClient {
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
            tokens,
        }
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, DataRequestError> {
        debug!(operation, "sending GraphQL request");
        let token = self.tokens.bearer_token().await;

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables });
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            if let Ok(body) = serde_json::from_slice::<ErrorsOnly>(&bytes) {
                if !body.errors.is_empty() {
                    return Err(DataRequestError::Graphql {
                        messages: body.errors,
                    });
                }
            }
            return Err(DataRequestError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let body: GraphqlResponse<T> = serde_json::from_slice(&bytes)?;
        if !body.errors.is_empty() {
            return Err(DataRequestError::Graphql {
                messages: body.errors,
            });
        }
        body.data.ok_or(DataRequestError::MissingData("data"))
    }
}

#[derive(Deserialize)]
struct ProjectConnection {
    #[serde(default)]
    items: Vec<Option<Project>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListProjectsData {
    list_projects: Option<ProjectConnection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectData {
    create_project: Option<Project>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProjectData {
    update_project: Option<Project>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteProjectData {
    #[allow(dead_code)]
    delete_project: Option<serde_json::Value>,
}

pub struct GraphqlProjectRepository {
    client: GraphqlClient,
    list_query: String,
    create_mutation: String,
    update_mutation: String,
    delete_mutation: String,
}

impl GraphqlProjectRepository {
    pub fn new(client: GraphqlClient) -> Self {
        Self {
            client,
            list_query: format!("query ListProjects {{ listProjects {{ items {{ {PROJECT_FIELDS} }} }} }}"),
            create_mutation: format!(
                "mutation CreateProject($name: String!, $description: String) {{ \
                 createProject(input: {{ name: $name, description: $description }}) {{ {PROJECT_FIELDS} }} }}"
            ),
            update_mutation: format!(
                "mutation UpdateProject($id: ID!, $name: String, $description: String) {{ \
                 updateProject(input: {{ id: $id, name: $name, description: $description }}) {{ {PROJECT_FIELDS} }} }}"
            ),
            delete_mutation: "mutation DeleteProject($id: ID!) { deleteProject(input: { id: $id }) { id } }"
                .to_string(),
        }
    }
}

#[async_trait]
impl ProjectRepository for GraphqlProjectRepository {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let data: ListProjectsData = self
            .client
            .execute("ListProjects", &self.list_query, json!({}))
            .await?;
        let connection = data
            .list_projects
            .ok_or(DataRequestError::MissingData("listProjects"))?;
        Ok(connection.items.into_iter().flatten().collect())
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let data: CreateProjectData = self
            .client
            .execute(
                "CreateProject",
                &self.create_mutation,
                json!({ "name": name, "description": description }),
            )
            .await?;
        data.create_project
            .ok_or_else(|| DataRequestError::MissingData("createProject").into())
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        name: &str,
        description: &str,
    ) -> Result<Project> {
        let data: UpdateProjectData = self
            .client
            .execute(
                "UpdateProject",
                &self.update_mutation,
                json!({ "id": id, "name": name, "description": description }),
            )
            .await?;
        data.update_project
            .ok_or_else(|| DataRequestError::MissingData("updateProject").into())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        let _: DeleteProjectData = self
            .client
            .execute("DeleteProject", &self.delete_mutation, json!({ "id": id }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/graphql_tests.rs"]
mod tests;
