pub mod commands;
pub mod db;
pub mod models;
pub mod repl;
pub mod store;

pub use commands::{ChatCommand, parse_command};
pub use models::{CreatedSession, SessionRecord, SessionState};
pub use repl::{ChatRepl, Flow, LineReader};
pub use store::SessionStore;
