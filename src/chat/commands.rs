//! Slash command parsing for the chat loop.
//!
//! Matching is case-sensitive. Commands without arguments must match
//! the whole line exactly; `/switch` and `/rename` take the rest of
//! the line after the first space as their argument.

/// A classified line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Show the list of commands.
    Help,
    /// Clear the screen and the history of the current chat.
    Clear,
    /// Pick a different model from the menu.
    Model,
    /// List all saved chats.
    Chats,
    /// Start a new chat and switch to it.
    New,
    /// Switch to the chat with this display name.
    Switch(String),
    /// Rename the current chat.
    Rename(String),
    /// `/switch` or `/rename` without a name. Carries the usage hint.
    MissingArgument(&'static str),
    /// Leave the program.
    Exit,
    /// Blank or whitespace-only input.
    Empty,
    /// Anything else is sent to the model.
    Message(String),
}

pub const SWITCH_USAGE: &str = "Please specify chat name: /switch chat_name";
pub const RENAME_USAGE: &str = "Please specify new name: /rename new_name";

pub fn parse_command(input: &str) -> ChatCommand {
    match input {
        "/help" => return ChatCommand::Help,
        "/clear" => return ChatCommand::Clear,
        "/model" => return ChatCommand::Model,
        "/chats" => return ChatCommand::Chats,
        "/new" => return ChatCommand::New,
        "/exit" => return ChatCommand::Exit,
        _ => {}
    }

    let (head, rest) = match input.split_once(' ') {
        Some((head, rest)) => (head, Some(rest)),
        None => (input, None),
    };
    let argument = rest.filter(|s| !s.is_empty()).map(str::to_string);

    match head {
        "/switch" => argument
            .map(ChatCommand::Switch)
            .unwrap_or(ChatCommand::MissingArgument(SWITCH_USAGE)),
        "/rename" => argument
            .map(ChatCommand::Rename)
            .unwrap_or(ChatCommand::MissingArgument(RENAME_USAGE)),
        _ if input.trim().is_empty() => ChatCommand::Empty,
        _ => ChatCommand::Message(input.to_string()),
    }
}

pub fn help_text() -> &'static str {
    "/help - available commands
/clear - clear current chat
/model - change model
/chats - list all chats
/new - create new chat
/switch name - switch to chat by name
/rename new_name - rename current chat
/exit - exit program"
}
