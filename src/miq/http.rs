//! HTTP utilities for ManageIQ REST API calls

use super::auth::Credentials;
use crate::error::{MiqError, MiqResult};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// A failed call is sent at most this many times in total
const MAX_ATTEMPTS: u32 = 2;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human message out of a ManageIQ error body:
/// `{"error": {"kind": "not_found", "message": "..."}}`
fn extract_error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

/// Transport settings for [`MiqHttpClient`]
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }
}

/// HTTP client wrapper for ManageIQ API calls
#[derive(Clone)]
pub struct MiqHttpClient {
    client: Client,
}

impl MiqHttpClient {
    /// Create a new HTTP client
    pub fn new(settings: &HttpSettings) -> MiqResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("miqctl/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| MiqError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a GET request to the API
    pub async fn get(&self, url: &str, credentials: &Credentials) -> MiqResult<Value> {
        self.execute(Method::GET, url, credentials, None).await
    }

    /// Make a POST request to the API
    pub async fn post(
        &self,
        url: &str,
        credentials: &Credentials,
        body: Option<&Value>,
    ) -> MiqResult<Value> {
        self.execute(Method::POST, url, credentials, body).await
    }

    /// Make a DELETE request to the API
    pub async fn delete(&self, url: &str, credentials: &Credentials) -> MiqResult<Value> {
        self.execute(Method::DELETE, url, credentials, None).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        credentials: &Credentials,
        body: Option<&Value>,
    ) -> MiqResult<Value> {
        let mut attempt = 1;
        loop {
            match self.execute_once(method.clone(), url, credentials, body).await {
                Err(err) if may_retry(&method, &err) && attempt < MAX_ATTEMPTS => {
                    tracing::warn!("{} {} failed ({}), retrying once", method, url, err);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn execute_once(
        &self,
        method: Method,
        url: &str,
        credentials: &Credentials,
        body: Option<&Value>,
    ) -> MiqResult<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&credentials.username, Some(credentials.password()));

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MiqError::from_reqwest(&e))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| MiqError::from_reqwest(&e))?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(MiqError::Http {
                status: status.as_u16(),
                message: extract_error_message(&response_body, status),
            });
        }

        // Handle empty response
        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).map_err(MiqError::from)
    }
}

/// GET is retried on any retryable error. Edits and deletes only on 503: after a
/// timeout or 502/504 the server may already have applied them.
fn may_retry(method: &Method, error: &MiqError) -> bool {
    if *method == Method::GET {
        return error.is_retryable();
    }
    matches!(error, MiqError::Http { status: 503, .. })
}

/// Format an API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_miq_error(error: &anyhow::Error) -> String {
    if let Some(miq) = error.downcast_ref::<MiqError>() {
        return match miq {
            MiqError::Http { status: 401, .. } => {
                "Authentication failed. Check MIQ_USERNAME and MIQ_PASSWORD.".to_string()
            }
            MiqError::Http { status: 403, .. } => {
                "Permission denied. Check the user's ManageIQ role.".to_string()
            }
            MiqError::Http { status: 404, .. } => "Resource not found.".to_string(),
            MiqError::Http { status: 500..=599, .. } => {
                "ManageIQ service temporarily unavailable. Please try again.".to_string()
            }
            MiqError::Transport(_) => {
                format!("{}. Check the API URL and your network connection.", miq)
            }
            // Resolver outcomes are already user-facing
            _ => miq.to_string(),
        };
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
