use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

pub const MAX_TOKENS: u32 = 5000;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const HTTPS_PORT: u16 = 443;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// Failure kinds of a single completion request. The `Display` text is
/// what the user sees after the `Error: ` prefix.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Request timeout")]
    Timeout,
    #[error("{0}")]
    Transport(reqwest::Error),
    #[error("Invalid JSON response")]
    Parse(#[source] serde_json::Error),
    #[error("Invalid response format from API")]
    ResponseShape,
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Transport(err)
        }
    }
}

/// Anything that can turn a prompt into an assistant reply. The
/// dispatcher only talks to the network through this.
#[async_trait]
pub trait ChatApi {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError>;
}

/// Builds the base URL for a configured host. A bare host name is
/// addressed over HTTPS on port 443; anything that already carries a
/// scheme is used as is.
pub fn base_url(api_hostname: &str) -> String {
    let host = api_hostname.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}:{}", host, HTTPS_PORT)
    }
}

pub fn completion_payload(prompt: &str, model: &str) -> Value {
    json!({
        "model": model,
        "messages": [Message::new(Role::User, prompt)],
        "max_tokens": MAX_TOKENS,
    })
}

/// Pulls `choices[0].message.content` out of a response body.
pub fn extract_content(body: &str) -> Result<String, CompletionError> {
    let resp: Value = serde_json::from_str(body).map_err(CompletionError::Parse)?;
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or(CompletionError::ResponseShape)
}

/// Issues one chat completion request and returns the assistant text.
pub async fn completion(
    client: &reqwest::Client,
    prompt: &str,
    model: &str,
    api_hostname: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<String, CompletionError> {
    let payload = completion_payload(prompt, model);
    let url = format!("{}/v1/chat/completions", base_url(api_hostname));
    tracing::debug!("POST {} model={}", url, model);

    // The status code is deliberately ignored, error bodies fail the
    // shape check instead
    let body = client
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(&payload)
        .send()
        .await?
        .text()
        .await?;

    extract_content(&body)
}

/// `ChatApi` backed by an OpenAI compatible chat completions endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_hostname: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_hostname: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ChatApi for OpenAiClient {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
        completion(
            &self.client,
            prompt,
            model,
            &self.api_hostname,
            &self.api_key,
            self.timeout,
        )
        .await
    }
}
