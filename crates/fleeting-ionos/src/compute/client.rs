//! IONOS Cloud API client implementation.
//!
//! Talks to the Cloud API v6 for server and template management.
//! API Documentation: <https://api.ionos.com/docs/cloud/v6/>

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::models::{CreateServer, ItemList, Server, Template};
use crate::provider::ProviderError;

/// Base URL for the IONOS Cloud API.
const API_BASE_URL: &str = "https://api.ionos.com/cloudapi/v6";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials for the Cloud API.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Bearer token authentication.
    Token(String),
    /// HTTP basic authentication.
    Basic { username: String, password: String },
}

/// IONOS Cloud API client.
#[derive(Clone)]
pub struct ComputeClient {
    /// HTTP client.
    client: Client,
    /// API base URL.
    base_url: String,
    /// Credentials applied to every request.
    auth: Auth,
}

impl ComputeClient {
    /// Create a new client against the given base URL.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create a client from process environment variables.
    ///
    /// Reads `IONOS_TOKEN`, falling back to `IONOS_USERNAME` and
    /// `IONOS_PASSWORD`. `IONOS_API_URL` overrides the default endpoint.
    ///
    /// # Errors
    /// Returns [`ProviderError::Config`] if no credentials are set.
    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url =
            std::env::var("IONOS_API_URL").unwrap_or_else(|_| API_BASE_URL.to_string());

        if let Ok(token) = std::env::var("IONOS_TOKEN") {
            return Self::new(base_url, Auth::Token(token));
        }

        match (std::env::var("IONOS_USERNAME"), std::env::var("IONOS_PASSWORD")) {
            (Ok(username), Ok(password)) => {
                Self::new(base_url, Auth::Basic { username, password })
            }
            _ => Err(ProviderError::Config(
                "missing API credentials: set IONOS_TOKEN or IONOS_USERNAME/IONOS_PASSWORD"
                    .to_string(),
            )),
        }
    }

    /// Apply credentials to a request.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Token(token) => req.bearer_auth(token),
            Auth::Basic { username, password } => req.basic_auth(username, Some(password)),
        }
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        depth: u8,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, depth, "GET request");

        let response = self
            .authorize(self.client.get(&url))
            .query(&[("depth", depth.to_string())])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "POST request");

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make an authenticated DELETE request. A 404 counts as success: the
    /// resource is gone either way.
    async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "DELETE request");

        let response = self.authorize(self.client.delete(&url)).send().await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ProviderError::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(ProviderError::NotFound(text))
        } else {
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Request creation of a server in the given datacenter.
    ///
    /// # Errors
    /// Returns error if the request fails or is rejected.
    pub async fn create_server(
        &self,
        datacenter_id: &str,
        request: &CreateServer,
    ) -> Result<Server, ProviderError> {
        self.post(&format!("/datacenters/{datacenter_id}/servers"), request)
            .await
    }

    /// Request deletion of a server by id.
    ///
    /// # Errors
    /// Returns error if the request fails or is rejected.
    pub async fn delete_server(
        &self,
        datacenter_id: &str,
        server_id: &str,
    ) -> Result<(), ProviderError> {
        self.delete(&format!("/datacenters/{datacenter_id}/servers/{server_id}"))
            .await
    }

    /// Fetch one server by id, with sub-resources down to the given depth.
    ///
    /// # Errors
    /// Returns [`ProviderError::NotFound`] for unknown ids.
    pub async fn get_server(
        &self,
        datacenter_id: &str,
        server_id: &str,
        depth: u8,
    ) -> Result<Server, ProviderError> {
        self.get(
            &format!("/datacenters/{datacenter_id}/servers/{server_id}"),
            depth,
        )
        .await
    }

    /// List all servers in the datacenter, with sub-resources down to the
    /// given depth.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_servers(
        &self,
        datacenter_id: &str,
        depth: u8,
    ) -> Result<Vec<Server>, ProviderError> {
        let list: ItemList<Server> = self
            .get(&format!("/datacenters/{datacenter_id}/servers"), depth)
            .await?;
        Ok(list.items)
    }

    /// List all CUBE templates visible to the account.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_templates(&self) -> Result<Vec<Template>, ProviderError> {
        let list: ItemList<Template> = self.get("/templates", 1).await?;
        Ok(list.items)
    }

    /// Resolve a template name to its UUID via a single listing.
    ///
    /// The listing is linear-scanned for an exact name match; the first match
    /// wins. Templates are immutable for the lifetime of a run, so callers
    /// cache the result.
    ///
    /// # Errors
    /// Returns [`ProviderError::NotFound`] if no template has that name.
    pub async fn resolve_template(&self, name: &str) -> Result<String, ProviderError> {
        let templates = self.list_templates().await?;
        templates
            .into_iter()
            .find(|t| t.properties.name.as_deref() == Some(name))
            .map(|t| t.id)
            .ok_or_else(|| ProviderError::NotFound(format!("template {name}")))
    }
}
