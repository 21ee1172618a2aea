//! Error types
//!
//! Typed failures surfaced by the library. The binary wraps these in `anyhow`.

use thiserror::Error;

/// ManageIQ client and resolver errors
#[derive(Error, Debug)]
pub enum MiqError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("{} resources named '{name}' match; pick one of: {}", .candidates.len(), .candidates.join(", "))]
    Ambiguous { name: String, candidates: Vec<String> },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl MiqError {
    /// Get HTTP status code for the error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MiqError::Http { status, .. } => Some(*status),
            MiqError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Check if a request that failed with this error may be sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            MiqError::Transport(_) => true,
            MiqError::Http { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self {
            MiqError::Validation(_) => "validation",
            MiqError::NotFound { .. } => "not_found",
            MiqError::Ambiguous { .. } => "ambiguous",
            MiqError::Transport(_) => "network",
            MiqError::Http { .. } => "http",
            MiqError::Decode(_) => "decode",
        }
    }

    pub(crate) fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            MiqError::Transport("Request timeout".to_string())
        } else if error.is_connect() {
            MiqError::Transport("Connection failed".to_string())
        } else {
            MiqError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for MiqError {
    fn from(error: serde_json::Error) -> Self {
        MiqError::Decode(error.to_string())
    }
}

/// Result type alias for ManageIQ operations
pub type MiqResult<T> = Result<T, MiqError>;
