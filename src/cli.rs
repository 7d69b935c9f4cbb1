//! Command-line interface definition for Colloquy
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, model and account lookups,
//! history management, export/import, and settings.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Colloquy - terminal chat client for MiniMax-compatible AI APIs
#[derive(Parser, Debug, Clone)]
#[command(name = "colloquy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override the storage database path
    #[arg(long, env = "COLLOQUY_DATA_DB")]
    pub data_db: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Colloquy
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Override the model for this session
        #[arg(short, long)]
        model: Option<String>,

        /// Disable streaming replies for this session
        #[arg(long)]
        no_stream: bool,

        /// Resume a conversation by id (full UUID or prefix)
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// List available models
    Models {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show account information
    Account,

    /// Manage stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Export a conversation to a file
    Export {
        /// Conversation id (full UUID or prefix)
        id: String,

        /// Export format: json, text, or markdown
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output path (defaults to a generated filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a conversation from a file
    Import {
        /// Path to the exported conversation
        path: PathBuf,

        /// Import format; inferred from the extension when omitted
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Inspect and change settings
    Config {
        /// Settings subcommand
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations
    List,

    /// Show one conversation's messages
    Show {
        /// Conversation id (full UUID or prefix)
        id: String,
    },

    /// Search message contents across all conversations
    Search {
        /// Case-insensitive substring to look for
        query: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id (full UUID or prefix)
        id: String,
    },

    /// Show aggregate message statistics
    Stats,

    /// Delete all stored conversations
    Clear,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the current settings (API key redacted)
    Show,

    /// Set a single setting
    Set {
        /// Setting name (e.g. max_tokens, theme, base_url)
        key: String,

        /// New value
        value: String,
    },

    /// Validate the current settings
    Validate,

    /// Restore the default settings
    Reset,

    /// Show storage usage against the quota
    Usage,

    /// Erase all persisted data
    ClearData,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
