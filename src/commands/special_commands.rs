//! Special commands parser for interactive chat mode
//!
//! Special commands manage the session instead of being sent to the model:
//! clearing the chat, inspecting the transcript, changing sampling
//! parameters and re-entering the API token.
//!
//! Commands are prefixed with `/` and are case-insensitive. The bare words
//! `exit` and `quit` are accepted too.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Display help information
    Help,

    /// Clear the chat back to the greeting
    Reset,

    /// Print every turn of the transcript
    History,

    /// Show the model and sampling parameters
    ShowParams,

    /// Change one sampling parameter
    ///
    /// The value is kept as text; range checks happen when it is applied.
    Set { name: String, value: String },

    /// Prompt for a new API token
    Token,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input to the model
    None,
}

const SET_USAGE: &str = "/set <temperature|top_p|max_length> <value>";

/// Parse user input to detect special commands
///
/// # Returns
///
/// Returns `SpecialCommand::None` for ordinary text
///
/// # Errors
///
/// Returns `CommandError` for unknown commands or bad arguments
///
/// # Examples
///
/// ```
/// use lipi::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/clear").unwrap(), SpecialCommand::Reset);
/// assert_eq!(
///     parse_special_command("/set top_p 0.5").unwrap(),
///     SpecialCommand::Set { name: "top_p".to_string(), value: "0.5".to_string() }
/// );
/// assert_eq!(parse_special_command("mero naam").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/reset" | "/clear" => Ok(SpecialCommand::Reset),
        "/history" => Ok(SpecialCommand::History),
        "/params" => Ok(SpecialCommand::ShowParams),
        "/token" => Ok(SpecialCommand::Token),
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        "/set" => Err(CommandError::MissingArgument {
            command: "/set".to_string(),
            usage: SET_USAGE.to_string(),
        }),
        input if input.starts_with("/set ") => {
            let mut parts = input[5..].split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(value), None) => Ok(SpecialCommand::Set {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
                (Some(_), Some(_), Some(extra)) => Err(CommandError::UnsupportedArgument {
                    command: "/set".to_string(),
                    arg: extra.to_string(),
                }),
                _ => Err(CommandError::MissingArgument {
                    command: "/set".to_string(),
                    usage: SET_USAGE.to_string(),
                }),
            }
        }

        input if input.starts_with('/') => {
            let cmd = input.split_whitespace().next().unwrap_or(input);
            let known = [
                "/help", "/?", "/reset", "/clear", "/history", "/params", "/token", "/exit",
                "/quit",
            ];
            if known.contains(&cmd) {
                let arg = input[cmd.len()..].trim();
                Err(CommandError::UnsupportedArgument {
                    command: cmd.to_string(),
                    arg: arg.to_string(),
                })
            } else {
                Err(CommandError::UnknownCommand(cmd.to_string()))
            }
        }

        _ => Ok(SpecialCommand::None),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

CHAT:
  /reset          - Clear chat history back to the greeting
  /clear          - Same as /reset
  /history        - Show every turn of the current chat

GENERATION PARAMETERS:
  /params                   - Show the model and current parameters
  /set temperature <value>  - 0.01 to 5.0
  /set top_p <value>        - 0.01 to 1.0
  /set max_length <value>   - 32 to 128, in steps of 8

CREDENTIALS:
  /token          - Enter a different Replicate API token

SESSION CONTROL:
  /help           - Show this help message
  /?              - Same as /help
  /exit, exit     - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive
  - Any other text is sent to the model for transliteration
"#
    );
}
