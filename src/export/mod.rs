//! Conversation export and import
//!
//! Serializes a conversation to JSON (full-fidelity round trip), plain
//! text, or Markdown, and parses all three back into a conversation
//! snapshot. Text and Markdown import are lossy best-effort parsers
//! built on line-oriented regex matching.

use crate::chat::conversation::Conversation;
use crate::error::{ColloquyError, Result};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};

/// Snapshot format version stamped into exports
const EXPORT_VERSION: &str = "1.0.0";

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Full-fidelity JSON snapshot
    #[default]
    Json,
    /// Plain text transcript
    Text,
    /// Markdown transcript
    Markdown,
}

impl ExportFormat {
    /// Parse a format name; unknown names fall back to JSON
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::export::ExportFormat;
    ///
    /// assert_eq!(ExportFormat::parse_str("markdown"), ExportFormat::Markdown);
    /// assert_eq!(ExportFormat::parse_str("weird"), ExportFormat::Json);
    /// ```
    pub fn parse_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Self::Text,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Json,
        }
    }

    /// Guess a format from a file extension
    pub fn from_extension(extension: &str) -> Self {
        Self::parse_str(extension)
    }

    /// Canonical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
            Self::Markdown => "md",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

/// Build the JSON snapshot of a conversation
///
/// The snapshot carries the conversation verbatim plus an export
/// timestamp and format version.
pub fn conversation_snapshot(conversation: &Conversation) -> Value {
    json!({
        "id": conversation.id,
        "title": conversation.title,
        "model": conversation.model,
        "settings": conversation.settings,
        "messages": conversation.messages,
        "created_at": conversation.created_at,
        "updated_at": conversation.updated_at,
        "exported_at": Utc::now(),
        "version": EXPORT_VERSION,
    })
}

/// Serialize a conversation in the requested format
///
/// # Errors
///
/// Only the JSON path can fail (serialization), and then only on
/// pathological input.
pub fn export_conversation(conversation: &Conversation, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            Ok(serde_json::to_string_pretty(&conversation_snapshot(conversation))?)
        }
        ExportFormat::Text => Ok(format_as_text(conversation)),
        ExportFormat::Markdown => Ok(format_as_markdown(conversation)),
    }
}

/// Parse exported data back into a conversation snapshot
///
/// JSON is parsed strictly; text and Markdown are best-effort. The
/// returned snapshot feeds `ChatStore::import_conversation`, which
/// assigns any missing ids and timestamps.
///
/// # Errors
///
/// Returns a malformed-data error when JSON does not parse or when a
/// transcript yields no messages at all.
pub fn parse_import(data: &str, format: ExportFormat) -> Result<Value> {
    match format {
        ExportFormat::Json => serde_json::from_str(data).map_err(|e| {
            ColloquyError::Malformed(format!("failed to parse conversation JSON: {}", e)).into()
        }),
        ExportFormat::Text => parse_text_transcript(data),
        ExportFormat::Markdown => parse_markdown_transcript(data),
    }
}

fn format_as_text(conversation: &Conversation) -> String {
    let mut text = format!("Conversation: {}\n", conversation.title);
    text.push_str(&format!("Model: {}\n", conversation.model));
    text.push_str(&format!("Created: {}\n", conversation.created_at.to_rfc3339()));
    text.push_str(&format!("Exported: {}\n", Utc::now().to_rfc3339()));
    text.push('\n');
    text.push_str(&"=".repeat(50));
    text.push_str("\n\n");

    for message in &conversation.messages {
        let role = match message.role {
            crate::api::Role::User => "User",
            crate::api::Role::Assistant => "Assistant",
        };
        text.push_str(&format!(
            "[{}] {}\n{}\n\n",
            role,
            message.timestamp.to_rfc3339(),
            message.content
        ));
    }
    text
}

fn format_as_markdown(conversation: &Conversation) -> String {
    let mut markdown = format!("# {}\n\n", conversation.title);
    markdown.push_str(&format!("**Model:** {}\n", conversation.model));
    markdown.push_str(&format!(
        "**Created:** {}\n",
        conversation.created_at.to_rfc3339()
    ));
    markdown.push_str(&format!("**Exported:** {}\n\n", Utc::now().to_rfc3339()));
    markdown.push_str("---\n\n");

    for message in &conversation.messages {
        let header = match message.role {
            crate::api::Role::User => "## 👤 **User**",
            crate::api::Role::Assistant => "## 🤖 **Assistant**",
        };
        markdown.push_str(&format!(
            "{}\n\n*{}*\n\n{}\n\n---\n\n",
            header,
            message.timestamp.to_rfc3339(),
            message.content
        ));
    }
    markdown
}

/// Best-effort parse of a plain-text transcript
///
/// `[User] <timestamp>` / `[Assistant] <timestamp>` lines start a new
/// message; following lines accumulate into its content until the next
/// header. Metadata lines before the separator never match and are
/// dropped.
fn parse_text_transcript(data: &str) -> Result<Value> {
    let header =
        Regex::new(r"^\[(User|Assistant)\] (.*)$").map_err(|e| anyhow::anyhow!("{}", e))?;

    let mut messages: Vec<Value> = Vec::new();
    let mut current: Option<(String, String, String)> = None;

    for line in data.lines() {
        if let Some(captures) = header.captures(line) {
            if let Some(message) = current.take() {
                messages.push(transcript_message(message));
            }
            let role = captures[1].to_lowercase();
            let timestamp = captures[2].trim().to_string();
            current = Some((role, timestamp, String::new()));
        } else if let Some((_, _, content)) = current.as_mut() {
            if line.chars().all(|c| c == '=') && !line.is_empty() {
                continue;
            }
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(line);
        }
    }
    if let Some(message) = current.take() {
        messages.push(transcript_message(message));
    }

    if messages.is_empty() {
        return Err(
            ColloquyError::Malformed("transcript contained no messages".to_string()).into(),
        );
    }

    Ok(json!({
        "title": "Imported Text Conversation",
        "model": "unknown",
        "messages": messages,
    }))
}

/// Best-effort parse of a Markdown transcript
///
/// `## ... **User**` / `## ... **Assistant**` headers start a new
/// message; an `*italic*` line right after the header is taken as its
/// timestamp; remaining lines accumulate into the content. Heading and
/// separator lines are skipped.
fn parse_markdown_transcript(data: &str) -> Result<Value> {
    let header =
        Regex::new(r"^## .*\*\*(User|Assistant)\*\*").map_err(|e| anyhow::anyhow!("{}", e))?;
    let timestamp_line = Regex::new(r"^\*([^*]+)\*$").map_err(|e| anyhow::anyhow!("{}", e))?;

    let mut messages: Vec<Value> = Vec::new();
    let mut current: Option<(String, String, String)> = None;

    for line in data.lines() {
        if let Some(captures) = header.captures(line) {
            if let Some(message) = current.take() {
                messages.push(transcript_message(message));
            }
            current = Some((captures[1].to_lowercase(), String::new(), String::new()));
            continue;
        }

        let Some((_, timestamp, content)) = current.as_mut() else {
            continue;
        };
        if let Some(captures) = timestamp_line.captures(line) {
            if timestamp.is_empty() && content.is_empty() {
                *timestamp = captures[1].trim().to_string();
                continue;
            }
        }
        if line.starts_with('#') || line.starts_with("---") {
            continue;
        }
        if line.trim().is_empty() && content.is_empty() {
            continue;
        }
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(line);
    }
    if let Some(message) = current.take() {
        messages.push(transcript_message(message));
    }

    if messages.is_empty() {
        return Err(
            ColloquyError::Malformed("transcript contained no messages".to_string()).into(),
        );
    }

    Ok(json!({
        "title": "Imported Markdown Conversation",
        "model": "unknown",
        "messages": messages,
    }))
}

/// Build one snapshot message from a parsed (role, timestamp, content)
fn transcript_message((role, timestamp, content): (String, String, String)) -> Value {
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    json!({
        "role": role,
        "content": content.trim_end(),
        "timestamp": timestamp,
    })
}

/// Generate a dated export filename
///
/// # Examples
///
/// ```
/// use colloquy::export::{generate_export_filename, ExportFormat};
///
/// let name = generate_export_filename("conversation", ExportFormat::Markdown);
/// assert!(name.starts_with("conversation-"));
/// assert!(name.ends_with(".md"));
/// ```
pub fn generate_export_filename(kind: &str, format: ExportFormat) -> String {
    let date = Utc::now().format("%Y-%m-%d");
    if kind == "conversation" {
        format!("conversation-{}.{}", date, format.extension())
    } else {
        format!("colloquy-backup-{}.{}", date, format.extension())
    }
}

/// Sanitize a string for use as a filename
///
/// Replaces path-hostile characters and whitespace with underscores,
/// collapses runs of underscores, lowercases, and caps the length.
pub fn sanitize_filename(filename: &str) -> String {
    let mut sanitized = String::with_capacity(filename.len());
    let mut last_was_underscore = false;
    for c in filename.chars() {
        let mapped = match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        };
        if mapped == '_' {
            if !last_was_underscore {
                sanitized.push('_');
            }
            last_was_underscore = true;
        } else {
            sanitized.extend(mapped.to_lowercase());
            last_was_underscore = false;
        }
    }
    sanitized.chars().take(100).collect()
}
