use crate::irida_client::{
    CreateProjectRequest, ProjectApi, ProjectResource, RemoteError, RemoteProject,
    ResourceEnvelope, ResourceList, TokenResponse, identifier_to_string,
};
use app_state::RemoteSettings;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// REST client for the remote sample repository.
///
/// Authenticates with the password grant on first use and keeps the bearer token
/// until the server rejects it.
pub struct IridaClient {
    http_client: Client,
    settings: RemoteSettings,
    token: Mutex<Option<String>>,
}

impl IridaClient {
    pub fn new(settings: RemoteSettings) -> Result<Self, RemoteError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        Ok(Self {
            http_client,
            settings,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        let url: Url = format!("{}/api/{path}", self.settings.base_url).parse()?;
        Ok(url)
    }

    async fn fetch_token(&self) -> Result<String, RemoteError> {
        let mut url = self.endpoint("oauth/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "password")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("client_secret", &self.settings.client_secret)
            .append_pair("username", &self.settings.username)
            .append_pair("password", &self.settings.password);

        let response = self.http_client.post(url).send().await?;
        let token: TokenResponse = read_json(response).await?;
        debug!("Obtained remote access token");
        Ok(token.access_token)
    }

    async fn bearer_token(&self) -> Result<String, RemoteError> {
        let mut token = self.token.lock().await;
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }
        let fresh = self.fetch_token().await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    /// Sends a request built by `build`, retrying once with a new token on 401.
    async fn send_authorized<F>(&self, build: F) -> Result<Response, RemoteError>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder + Send + Sync,
    {
        let token = self.bearer_token().await?;
        let response = build(&self.http_client, &token).send().await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.forget_token().await;
        let token = self.bearer_token().await?;
        Ok(build(&self.http_client, &token).send().await?)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Server {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl ProjectApi for IridaClient {
    async fn list_projects(&self) -> Result<Vec<RemoteProject>, RemoteError> {
        let url = self.endpoint("projects")?;
        let response = self
            .send_authorized(|client, token| client.get(url.clone()).bearer_auth(token))
            .await?;
        let envelope: ResourceEnvelope<ResourceList<ProjectResource>> =
            read_json(response).await?;

        envelope
            .resource
            .resources
            .into_iter()
            .map(ProjectResource::into_project)
            .collect()
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<String, RemoteError> {
        let url = self.endpoint("projects")?;
        let body = CreateProjectRequest {
            name,
            project_description: description,
        };
        let response = self
            .send_authorized(|client, token| {
                client.post(url.clone()).bearer_auth(token).json(&body)
            })
            .await?;
        let envelope: ResourceEnvelope<Value> = read_json(response).await?;

        let identifier = envelope
            .resource
            .get("identifier")
            .ok_or_else(|| RemoteError::Decode("created project has no identifier".to_owned()))?;
        let identifier = identifier_to_string(identifier)?;
        info!("Created remote project {name} with id {identifier}");
        Ok(identifier)
    }
}
