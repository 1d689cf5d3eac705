//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to inspect and mutate the session without sending a
//! message to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Exit,

    /// Clear the conversation history and delete the persisted copy.
    Clear,

    /// Display the conversation history.
    History,

    /// Show the current configuration.
    ShowConfig,

    /// Display version information.
    Version,

    /// Set a configuration parameter.
    Set {
        /// The parameter name.
        param: String,
        /// The new value.
        value: String,
    },

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// The command word is matched case-insensitively. `/set` requires exactly
/// two argument tokens; anything else yields `ChatCommand::Invalid` with a
/// usage message rather than an error the caller has to classify.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut tokens = input[1..].split_whitespace();
    let Some(command) = tokens.next() else {
        return Some(ChatCommand::Invalid("empty command".to_string()));
    };
    let args: Vec<&str> = tokens.collect();

    let result = match command.to_lowercase().as_str() {
        "help" => ChatCommand::Help,
        "exit" | "quit" => ChatCommand::Exit,
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "config" => ChatCommand::ShowConfig,
        "version" => ChatCommand::Version,
        "set" => match args.as_slice() {
            [param, value] => ChatCommand::Set {
                param: param.to_string(),
                value: value.to_string(),
            },
            _ => ChatCommand::Invalid("usage: /set <param> <value>".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /help                  Show this help message
  /clear                 Clear conversation history
  /history               Show the conversation so far
  /config                Show current configuration
  /set <param> <value>   Set a parameter (temperature, max_tokens, stream, model)
  /version               Show version information
  /exit                  Exit the chat

Set examples:
  /set temperature 0.9   Sampling temperature, 0.0-2.0
  /set max_tokens 1000   Maximum tokens per response
  /set stream off        Toggle streaming output
  /set model deepseek-coder"#
}
