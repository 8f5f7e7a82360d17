use std::io;

use anyhow::Result;
use rustyline::DefaultEditor;

use crate::chat::{ChatRepl, SessionStore};
use crate::core::AppConfig;
use crate::core::db::open_and_initialize;
use crate::openai::OpenAiClient;

pub async fn run(config: AppConfig) -> Result<()> {
    let db = open_and_initialize(&config.storage_path).await?;
    tracing::debug!("Using chat storage at {}", config.storage_path);

    let store = SessionStore::new(db);
    let api = OpenAiClient::new(&config.api_hostname, &config.api_key);
    let rl = DefaultEditor::new()?;

    let mut repl = ChatRepl::new(api, store, rl, io::stdout());
    repl.run().await
}
