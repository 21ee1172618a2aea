//! ManageIQ Authentication
//!
//! Basic-auth credentials, read from flags or the environment. Never persisted.

use crate::error::{MiqError, MiqResult};
use std::fmt;

/// Environment variable holding the API user
pub const USERNAME_ENV: &str = "MIQ_USERNAME";
/// Environment variable holding the API password
pub const PASSWORD_ENV: &str = "MIQ_PASSWORD";

/// Username/password pair sent with every request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> MiqResult<Self> {
        if username.trim().is_empty() {
            return Err(MiqError::Validation("API username is not provided".to_string()));
        }
        if password.is_empty() {
            return Err(MiqError::Validation(format!(
                "API password is not provided (set {})",
                PASSWORD_ENV
            )));
        }
        Ok(Self {
            username: username.trim().to_string(),
            password: password.to_string(),
        })
    }

    /// Resolve credentials: explicit value > environment
    pub fn resolve(username: Option<&str>, password: Option<&str>) -> MiqResult<Self> {
        let username = username
            .map(str::to_string)
            .or_else(|| read_env(USERNAME_ENV))
            .unwrap_or_default();
        let password = password
            .map(str::to_string)
            .or_else(|| read_env(PASSWORD_ENV))
            .unwrap_or_default();
        Self::new(&username, &password)
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// Security: keep the password out of logs and panics
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
