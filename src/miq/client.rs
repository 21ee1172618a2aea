//! ManageIQ Client
//!
//! Main client for interacting with the ManageIQ REST API, combining credentials,
//! endpoint configuration and HTTP functionality.

use super::auth::Credentials;
use super::http::{HttpSettings, MiqHttpClient};
use crate::error::{MiqError, MiqResult};
use serde_json::Value;
use url::Url;

/// Connection settings injected into the client
#[derive(Debug, Clone)]
pub struct MiqConfig {
    /// API root, e.g. `https://manageiq.local/api`
    pub api_url: Url,
    pub http: HttpSettings,
}

impl MiqConfig {
    pub fn new(api_url: &str) -> MiqResult<Self> {
        let api_url = Url::parse(api_url.trim())
            .map_err(|e| MiqError::Validation(format!("invalid API URL '{}': {}", api_url, e)))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(MiqError::Validation(format!(
                "API URL must use http or https, got '{}'",
                api_url.scheme()
            )));
        }
        Ok(Self {
            api_url,
            http: HttpSettings::default(),
        })
    }

    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }
}

/// Main ManageIQ client
#[derive(Clone)]
pub struct MiqClient {
    pub config: MiqConfig,
    credentials: Credentials,
    http: MiqHttpClient,
}

impl MiqClient {
    /// Create a new client. One connection pool is reused for every call.
    pub fn new(config: MiqConfig, credentials: Credentials) -> MiqResult<Self> {
        let http = MiqHttpClient::new(&config.http)?;
        Ok(Self {
            config,
            credentials,
            http,
        })
    }

    /// Make a GET request to the API
    pub async fn get(&self, url: &str) -> MiqResult<Value> {
        self.http.get(url, &self.credentials).await
    }

    /// Make a POST request to the API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> MiqResult<Value> {
        self.http.post(url, &self.credentials, body).await
    }

    /// Make a DELETE request to the API
    pub async fn delete(&self, url: &str) -> MiqResult<Value> {
        self.http.delete(url, &self.credentials).await
    }

    /// Send a `{action, resource}` request body to a resource href
    pub async fn action(&self, url: &str, action: &str, resource: Value) -> MiqResult<Value> {
        let body = serde_json::json!({
            "action": action,
            "resource": resource,
        });
        self.post(url, Some(&body)).await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// API root without a trailing slash
    pub fn base_url(&self) -> String {
        self.config.api_url.as_str().trim_end_matches('/').to_string()
    }

    /// Build a collection URL, e.g. `<base>/vms`
    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url(), collection)
    }

    /// Build a single-resource URL, e.g. `<base>/services/12`
    pub fn resource_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url(), collection, urlencoding::encode(id))
    }
}
