//! The interactive chat loop: reads one line at a time, runs commands
//! against the active session, and sends everything else to the model.
//!
//! Each line is handled to completion (including the network round
//! trip and the save) before the next one is read.
use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::commands::{ChatCommand, help_text, parse_command};
use super::models::{DEFAULT_SESSION_ID, SessionState};
use super::store::SessionStore;
use crate::openai::ChatApi;
use crate::openai::models::{menu_lines, model_for_choice, parse_choice, resolve_model};

pub const TYPING_STEPS: usize = 3;
pub const TYPING_STEP_DELAY: Duration = Duration::from_millis(500);
pub const CLEAR_SCREEN_LINES: usize = 50;

const RULE: &str = "────────────────────────────────────────────────";

/// Source of user input. `Ok(None)` means the input was closed
/// (Ctrl-C, Ctrl-D, end of a script) and the program should wind down.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => Ok(None),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct ChatRepl<A, R, W> {
    api: A,
    store: SessionStore,
    state: SessionState,
    reader: R,
    out: W,
    typing_delay: Duration,
}

impl<A, R, W> ChatRepl<A, R, W>
where
    A: ChatApi,
    R: LineReader,
    W: Write,
{
    pub fn new(api: A, store: SessionStore, reader: R, out: W) -> Self {
        Self {
            api,
            store,
            state: SessionState::default(),
            reader,
            out,
            typing_delay: TYPING_STEP_DELAY,
        }
    }

    /// Overrides the pause between each of the typing dots.
    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Runs the whole program: restore the last session, pick a model,
    /// then chat until `/exit` or the input closes.
    pub async fn run(&mut self) -> Result<()> {
        if self.restore().await {
            writeln!(self.out, "Previous chat loaded")?;
        }

        self.show_help()?;
        self.show_model_menu()?;

        if self.select_initial_model().await? == Flow::Continue {
            self.chat_loop().await?;
        }

        writeln!(self.out, "Thanks for using!")?;
        Ok(())
    }

    /// Picks up the persisted counter and the last active session,
    /// falling back to the default session.
    pub async fn restore(&mut self) -> bool {
        if let Some(counter) = self.store.saved_counter().await {
            self.state.chat_counter = counter;
        }

        let resumed = match self.store.saved_current_id().await {
            Some(id) => self.store.load_session(&mut self.state, Some(id.as_str())).await,
            None => false,
        };
        resumed
            || self
                .store
                .load_session(&mut self.state, Some(DEFAULT_SESSION_ID))
                .await
    }

    /// Prompts until a number from the menu is entered. There is no way
    /// out of this prompt other than a valid choice or closing input.
    pub async fn select_initial_model(&mut self) -> Result<Flow> {
        loop {
            let Some(choice) = self.reader.read_line("Select a model (1-10): ")? else {
                return Ok(Flow::Exit);
            };

            match parse_choice(&choice) {
                Some(n) => {
                    self.state.current_model = model_for_choice(n).to_string();
                    self.store.save_session(&self.state).await;
                    writeln!(
                        self.out,
                        "The model is selected: {}\n",
                        self.state.current_model
                    )?;
                    return Ok(Flow::Continue);
                }
                None => writeln!(self.out, "Wrong choice! Try again.")?,
            }
        }
    }

    pub async fn chat_loop(&mut self) -> Result<()> {
        let name = self
            .store
            .get_display_name(&self.state.current_chat_id)
            .await;
        writeln!(self.out, "\nCurrent chat: {}", name)?;
        writeln!(
            self.out,
            "Enter your request or /help to view the available commands.\n"
        )?;

        while let Some(line) = self.reader.read_line(">>> ")? {
            if self.handle_line(&line).await? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match parse_command(line) {
            ChatCommand::Help => self.show_help()?,
            ChatCommand::Clear => self.clear().await?,
            ChatCommand::Model => return self.change_model().await,
            ChatCommand::Chats => self.show_chats().await?,
            ChatCommand::New => {
                let created = self.store.create_session(&mut self.state).await;
                writeln!(self.out, "New chat created: {}", created.name)?;
                writeln!(self.out, "Switched to chat: {}", created.name)?;
            }
            ChatCommand::Switch(name) => self.switch(&name).await?,
            ChatCommand::Rename(name) => self.rename(&name).await?,
            ChatCommand::MissingArgument(usage) => writeln!(self.out, "{}", usage)?,
            ChatCommand::Exit => {
                writeln!(self.out, "Exiting the program...")?;
                return Ok(Flow::Exit);
            }
            ChatCommand::Empty => writeln!(self.out, "Enter a message or command")?,
            ChatCommand::Message(text) => self.send_message(&text).await?,
        }
        Ok(Flow::Continue)
    }

    fn show_help(&mut self) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "╔══════════════════════════════════════════════╗")?;
        writeln!(self.out, "║               === COMMANDS ===               ║")?;
        writeln!(self.out, "╚══════════════════════════════════════════════╝")?;
        writeln!(self.out, "{}", help_text())?;
        writeln!(self.out, "\n")?;
        Ok(())
    }

    fn show_model_menu(&mut self) -> Result<()> {
        writeln!(self.out, "╔══════════════════════════════════════════════╗")?;
        writeln!(self.out, "║              === SELECT MODEL ===            ║")?;
        writeln!(self.out, "╚══════════════════════════════════════════════╝")?;
        for line in menu_lines() {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out, "\n{}\n", RULE)?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        for _ in 0..CLEAR_SCREEN_LINES {
            writeln!(self.out)?;
        }
        self.state.chat_history.clear();
        self.store.save_session(&self.state).await;
        writeln!(self.out, "The chat has been cleared!")?;
        Ok(())
    }

    async fn change_model(&mut self) -> Result<Flow> {
        self.show_model_menu()?;
        let Some(choice) = self.reader.read_line("Select model (1-10): ")? else {
            return Ok(Flow::Exit);
        };

        self.state.current_model = resolve_model(&choice).to_string();
        self.store.save_session(&self.state).await;
        writeln!(
            self.out,
            "The model has been changed to: {}",
            self.state.current_model
        )?;
        Ok(Flow::Continue)
    }

    async fn show_chats(&mut self) -> Result<()> {
        let ids = self.store.list_session_ids().await;
        writeln!(self.out, "\n╔══════════════════════════════════════════════╗")?;
        writeln!(self.out, "║                === CHATS ===                 ║")?;
        writeln!(self.out, "╚══════════════════════════════════════════════╝\n")?;

        if ids.is_empty() {
            writeln!(self.out, "No chats found")?;
        }
        for (i, id) in ids.iter().enumerate() {
            let name = self.store.get_display_name(id).await;
            let marker = if *id == self.state.current_chat_id {
                "[CURRENT]"
            } else {
                ""
            };
            writeln!(self.out, "{}. {} {}", i + 1, name, marker)?;
        }

        writeln!(self.out, "\nUse '/switch name' to switch to a chat")?;
        writeln!(self.out, "Use '/rename new_name' to rename current chat")?;
        writeln!(self.out, "{}\n", RULE)?;
        Ok(())
    }

    async fn switch(&mut self, name: &str) -> Result<()> {
        let Some(id) = self.store.find_session_by_name(name).await else {
            writeln!(self.out, "Chat not found: {}", name)?;
            return Ok(());
        };

        if self.store.switch_session(&mut self.state, &id).await {
            let name = self.store.get_display_name(&id).await;
            writeln!(self.out, "Switched to chat: {}", name)?;
        }
        Ok(())
    }

    async fn rename(&mut self, new_name: &str) -> Result<()> {
        let id = self.state.current_chat_id.clone();
        if self
            .store
            .rename_session(&mut self.state, &id, new_name)
            .await
        {
            writeln!(self.out, "Chat renamed to: {}", new_name)?;
            self.store.save_session(&self.state).await;
        } else {
            writeln!(self.out, "Error renaming chat")?;
        }
        Ok(())
    }

    async fn send_message(&mut self, text: &str) -> Result<()> {
        writeln!(self.out)?;
        for _ in 0..TYPING_STEPS {
            write!(self.out, ".")?;
            self.out.flush()?;
            tokio::time::sleep(self.typing_delay).await;
        }
        writeln!(self.out, "\n")?;

        let reply = match self.api.complete(text, &self.state.current_model).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Error API: {}", e);
                format!("Error: {}", e)
            }
        };
        writeln!(self.out, "{}\n", reply)?;

        self.state.push_turn(text, &reply);
        self.store.save_session(&self.state).await;
        Ok(())
    }
}
