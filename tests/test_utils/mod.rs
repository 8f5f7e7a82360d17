//! Test utilities for integration tests
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use aiterm::chat::{ChatRepl, LineReader, SessionStore};
use aiterm::core::db::open_and_initialize;
use aiterm::openai::{ChatApi, CompletionError};

/// Feeds a fixed script of lines, then reports the input as closed.
pub struct ScriptedReader {
    lines: VecDeque<String>,
}

impl ScriptedReader {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

pub enum MockReply {
    Text(&'static str),
    Timeout,
    ResponseShape,
}

/// Stands in for the chat completion API. Replies are handed out in
/// order and every call is recorded as `(prompt, model)`.
#[derive(Clone, Default)]
pub struct MockApi {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockApi {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(text.to_string()),
            Some(MockReply::Timeout) => Err(CompletionError::Timeout),
            Some(MockReply::ResponseShape) => Err(CompletionError::ResponseShape),
            None => Ok(String::from("ok")),
        }
    }
}

pub type TestRepl = ChatRepl<MockApi, ScriptedReader, Vec<u8>>;

/// Opens a fresh store in a temporary directory. Keep the returned
/// `TempDir` alive for as long as the store is used.
pub async fn test_store() -> (SessionStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = reopen_store(&dir).await;
    (store, dir)
}

pub async fn reopen_store(dir: &TempDir) -> SessionStore {
    let db = open_and_initialize(dir.path().to_str().unwrap())
        .await
        .expect("Failed to open test db");
    SessionStore::new(db)
}

pub fn test_repl(store: SessionStore, api: MockApi, lines: &[&str]) -> TestRepl {
    ChatRepl::new(api, store, ScriptedReader::new(lines), Vec::new())
        .with_typing_delay(Duration::ZERO)
}

pub fn output_of(repl: &TestRepl) -> String {
    String::from_utf8(repl.output().clone()).expect("Output is not utf8")
}
