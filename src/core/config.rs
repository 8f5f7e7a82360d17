use std::env;

use anyhow::{Result, anyhow};

pub const DEFAULT_STORAGE_PATH: &str = "./chat-storage";
pub const DEFAULT_API_HOSTNAME: &str = "api.openai.com";

/// Settings resolved once at startup. The API key and host are the
/// only credentials the rest of the program needs and are injected
/// from the environment rather than stored alongside the code.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub api_hostname: String,
    pub api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup so callers (and tests)
    /// don't have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_path = lookup("AITERM_STORAGE_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string());
        let api_hostname = lookup("AITERM_API_HOST")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_HOSTNAME.to_string());
        let api_key = lookup("AITERM_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|v| !v.trim().is_empty())
            .ok_or(anyhow!(
                "Missing env var AITERM_API_KEY (or OPENAI_API_KEY)"
            ))?;

        Ok(Self {
            storage_path,
            api_hostname,
            api_key,
        })
    }

    pub fn with_storage_path(mut self, storage_path: Option<String>) -> Self {
        if let Some(path) = storage_path {
            self.storage_path = path;
        }
        self
    }
}
