//! Special commands parser for interactive chat mode
//!
//! Special commands let the user manage the document session from the chat
//! prompt instead of asking a question:
//! - Upload more documents into the session
//! - Show the transcript or the current session id
//! - End or clear the session
//! - Display help information
//! - Exit the chat
//!
//! Commands are prefixed with `/` and are case-insensitive. File arguments
//! keep their original case.

use std::path::PathBuf;
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
    /// Upload documents into the session (starting one if needed)
    Upload(Vec<PathBuf>),

    /// Print the transcript of the current session
    History,

    /// Print the current session id
    ShowSession,

    /// End the session on the server
    EndSession,

    /// Clear the session and its history (asks for confirmation)
    ClearSession,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; the input is a question
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns [`CommandError::UnknownCommand`] if input starts with "/" but is
/// not a valid command, [`CommandError::UnsupportedArgument`] for arguments
/// to commands that take none, and [`CommandError::MissingArgument`] for
/// `/upload` without files.
///
/// # Examples
///
/// ```
/// use docportal::commands::special_commands::{parse_special_command, SpecialCommand};
/// use std::path::PathBuf;
///
/// let cmd = parse_special_command("/upload lease.pdf").unwrap();
/// assert_eq!(cmd, SpecialCommand::Upload(vec![PathBuf::from("lease.pdf")]));
///
/// let cmd = parse_special_command("What is the rent?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's a question (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed).to_lowercase();
    let args: Vec<&str> = words.collect();

    let no_args = |cmd: SpecialCommand| -> Result<SpecialCommand, CommandError> {
        match args.first() {
            Some(arg) => Err(CommandError::UnsupportedArgument {
                command: command.clone(),
                arg: arg.to_string(),
            }),
            None => Ok(cmd),
        }
    };

    match command.as_str() {
        "/upload" => {
            if args.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/upload".to_string(),
                    usage: "/upload <file> [file...]".to_string(),
                })
            } else {
                Ok(SpecialCommand::Upload(
                    args.iter().map(PathBuf::from).collect(),
                ))
            }
        }
        "/history" | "/transcript" => no_args(SpecialCommand::History),
        "/session" => no_args(SpecialCommand::ShowSession),
        "/end" => no_args(SpecialCommand::EndSession),
        "/clear" => no_args(SpecialCommand::ClearSession),
        "/help" | "/?" => no_args(SpecialCommand::Help),
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Document Q&A
=================================

DOCUMENTS:
  /upload <file> [file...]  - Upload documents into the session
                              (.pdf, .doc, .docx, .txt)

SESSION:
  /history        - Show the conversation so far
  /session        - Show the current session id
  /end            - End the session
  /clear          - Clear the session and its history (asks first)

OTHER:
  /help           - Show this help message
  /exit, exit     - Leave the chat

Anything else is sent as a question about the uploaded documents.
"#
    );
}
