//! The models for persisted chat sessions and the in-memory state of
//! the active one.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::openai::models::DEFAULT_MODEL;

pub const DEFAULT_SESSION_ID: &str = "default";

/// Speaker tag prefixed to each history line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    You,
    Ai,
}

impl Speaker {
    pub fn line(&self, text: &str) -> String {
        match self {
            Speaker::You => format!("You: {}", text),
            Speaker::Ai => format!("AI: {}", text),
        }
    }
}

/// What gets stored under `session:{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub name: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedSession {
    pub id: String,
    pub name: String,
}

/// Snapshot of the active session owned by the dispatcher. The id is
/// the storage key and never changes once assigned; renaming only
/// touches `current_chat_name`.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub current_model: String,
    pub chat_history: Vec<String>,
    pub current_chat_id: String,
    pub current_chat_name: String,
    pub chat_counter: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_model: DEFAULT_MODEL.to_string(),
            chat_history: Vec::new(),
            current_chat_id: DEFAULT_SESSION_ID.to_string(),
            current_chat_name: DEFAULT_SESSION_ID.to_string(),
            chat_counter: 1,
        }
    }
}

impl SessionState {
    pub fn push_turn(&mut self, input: &str, reply: &str) {
        self.chat_history.push(Speaker::You.line(input));
        self.chat_history.push(Speaker::Ai.line(reply));
    }
}

pub fn session_key(id: &str) -> String {
    format!("session:{}", id)
}

pub fn session_id_for(counter: u64) -> String {
    format!("chat_{}", counter)
}

pub fn session_name_for(counter: u64) -> String {
    format!("New Chat {}", counter)
}
