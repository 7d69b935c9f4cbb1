//! Slash-command parser for the interactive chat session
//!
//! Input starting with `/` is dispatched here before anything is sent
//! to the backend; `exit` and `quit` work without the slash.

use colored::Colorize;

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// `/new` - start a new conversation
    New,
    /// `/list` - list conversations
    List,
    /// `/switch <id>` - switch the current conversation
    Switch(String),
    /// `/retry` - resend the last user message
    Retry,
    /// `/clear` - clear the current conversation
    Clear,
    /// `/search <query>` - search message contents
    Search(String),
    /// `/stats` - show aggregate statistics
    Stats,
    /// `/help` - show available commands
    Help,
    /// `exit` / `quit` - leave the session
    Exit,
    /// An unrecognized slash command
    Unknown(String),
    /// Not a command; treat as a chat message
    None,
}

/// Parse one line of REPL input
///
/// # Examples
///
/// ```
/// use colloquy::commands::special::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new"), SpecialCommand::New);
/// assert_eq!(
///     parse_special_command("/search borrow"),
///     SpecialCommand::Search("borrow".to_string())
/// );
/// assert_eq!(parse_special_command("hello"), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> SpecialCommand {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        return SpecialCommand::Exit;
    }
    if !trimmed.starts_with('/') {
        return SpecialCommand::None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().unwrap_or("").trim();

    match command {
        "/new" => SpecialCommand::New,
        "/list" => SpecialCommand::List,
        "/switch" => SpecialCommand::Switch(argument.to_string()),
        "/retry" => SpecialCommand::Retry,
        "/clear" => SpecialCommand::Clear,
        "/search" => SpecialCommand::Search(argument.to_string()),
        "/stats" => SpecialCommand::Stats,
        "/help" => SpecialCommand::Help,
        "/exit" | "/quit" => SpecialCommand::Exit,
        other => SpecialCommand::Unknown(other.to_string()),
    }
}

/// Print the slash-command reference
pub fn print_help() {
    println!("\n{}", "Available commands:".bold());
    println!("  /new             Start a new conversation");
    println!("  /list            List conversations");
    println!("  /switch <id>     Switch to a conversation (id prefix is enough)");
    println!("  /retry           Resend the last user message");
    println!("  /clear           Clear the current conversation");
    println!("  /search <query>  Search message contents");
    println!("  /stats           Show message statistics");
    println!("  /help            Show this help");
    println!("  exit             Leave the session\n");
}
