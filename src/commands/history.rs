//! Stored-conversation management commands

use crate::cli::HistoryCommand;
use crate::error::{ColloquyError, Result};

use colored::Colorize;
use prettytable::{row, Table};

/// Handle a `history` subcommand
pub fn handle_history(command: HistoryCommand) -> Result<()> {
    let settings = super::load_settings_store()?;
    let mut store = super::load_chat_store(&settings)?;

    match command {
        HistoryCommand::List => {
            if store.conversations().is_empty() {
                println!("No stored conversations");
                return Ok(());
            }
            let mut table = Table::new();
            table.add_row(row!["ID", "TITLE", "MESSAGES", "MODEL", "UPDATED"]);
            for conversation in store.conversations() {
                table.add_row(row![
                    &conversation.id.to_string()[..8],
                    conversation.title,
                    conversation.messages.len(),
                    conversation.model,
                    conversation.updated_at.format("%Y-%m-%d %H:%M"),
                ]);
            }
            table.printstd();
        }
        HistoryCommand::Show { id } => {
            let conversation_id = store.find_by_prefix(&id).ok_or_else(|| {
                ColloquyError::Malformed(format!("no conversation matches '{}'", id))
            })?;
            // find_by_prefix only returns ids present in the collection.
            let Some(conversation) = store.conversation(conversation_id) else {
                return Ok(());
            };
            println!("\n{} ({})\n", conversation.title.bold(), conversation.model);
            for message in &conversation.messages {
                let role = match message.role {
                    crate::api::Role::User => "user".cyan(),
                    crate::api::Role::Assistant => "assistant".green(),
                };
                println!(
                    "[{}] {}",
                    role,
                    message.timestamp.format("%Y-%m-%d %H:%M:%S")
                );
                println!("{}\n", message.content);
            }
        }
        HistoryCommand::Search { query } => {
            let results = store.search_messages(&query);
            if results.is_empty() {
                println!("No matches");
                return Ok(());
            }
            for result in results {
                println!(
                    "{} [{}] {}",
                    result.conversation_title.cyan(),
                    result.message.role,
                    result.matched.replace('\n', " ")
                );
            }
        }
        HistoryCommand::Delete { id } => {
            let conversation_id = store.find_by_prefix(&id).ok_or_else(|| {
                ColloquyError::Malformed(format!("no conversation matches '{}'", id))
            })?;
            store.delete_conversation(conversation_id);
            store.save_conversations();
            println!("Deleted {}", conversation_id);
        }
        HistoryCommand::Stats => {
            let stats = store.message_stats();
            println!("Conversations: {}", stats.total_conversations);
            println!("Messages:      {}", stats.total_messages);
            println!("  user:        {}", stats.user_messages);
            println!("  assistant:   {}", stats.assistant_messages);
            println!(
                "Average:       {} messages per conversation",
                stats.average_messages_per_conversation
            );
        }
        HistoryCommand::Clear => {
            let count = store.conversations().len();
            let ids: Vec<_> = store.conversations().iter().map(|c| c.id).collect();
            for id in ids {
                store.delete_conversation(id);
            }
            store.save_conversations();
            println!("Deleted {} conversations", count);
        }
    }
    Ok(())
}
