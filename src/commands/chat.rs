//! Interactive chat session handler
//!
//! Runs a readline-based loop against the conversation store. Assistant
//! replies stream to the terminal when streaming is enabled; slash
//! commands manage conversations without leaving the session. The store
//! is shared with a background autosave task through an async mutex, so
//! saves serialize with in-flight sends.

use crate::api::{ChatRequest, ChatService, Role};
use crate::chat::message::ChatMessage;
use crate::chat::store::{ChatStore, SearchMatch, SendOptions};
use crate::commands::special::{parse_special_command, print_help, SpecialCommand};
use crate::error::Result;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Seconds between background saves of the conversation collection
const AUTO_SAVE_INTERVAL_SECS: u64 = 30;

/// Start an interactive chat session
///
/// # Arguments
///
/// * `model` - Optional model override for this session
/// * `no_stream` - Disable streaming replies regardless of settings
/// * `resume` - Optional conversation id (or prefix) to resume
pub async fn run_chat(
    model: Option<String>,
    no_stream: bool,
    resume: Option<String>,
) -> Result<()> {
    let settings_store = super::load_settings_store()?;
    let settings = settings_store.settings().clone();

    let mut chat_store = super::load_chat_store(&settings_store)?;
    chat_store.initialize();

    if let Some(prefix) = &resume {
        match chat_store.find_by_prefix(prefix) {
            Some(id) => {
                chat_store.set_current_conversation(id);
                tracing::info!("Resumed conversation {}", id);
            }
            None => println!(
                "{}",
                format!("No stored conversation matches '{}'", prefix).yellow()
            ),
        }
    }

    match ChatService::new(settings.api_config()) {
        Ok(service) => chat_store.set_service(service),
        Err(error) => {
            println!("{}", format!("{}", error).yellow());
            println!(
                "{}",
                "Set credentials with: colloquy config set api_key <key>\n".yellow()
            );
        }
    }

    let stream_replies = settings.stream_responses && !no_stream;
    let options = SendOptions {
        model,
        ..SendOptions::default()
    };

    let store = Arc::new(Mutex::new(chat_store));

    let autosave = settings.auto_save.then(|| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(AUTO_SAVE_INTERVAL_SECS));
            // The first tick fires immediately; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                store.lock().await.save_conversations();
            }
        })
    });

    print_welcome_banner(
        options.model.as_deref().unwrap_or(&settings.default_model),
        stream_replies,
    );

    let mut rl = DefaultEditor::new()?;
    loop {
        let prompt = {
            let guard = store.lock().await;
            format_prompt(&guard)
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                match parse_special_command(trimmed) {
                    SpecialCommand::New => {
                        store.lock().await.create_new_conversation(None);
                        println!("Started a new conversation\n");
                        continue;
                    }
                    SpecialCommand::List => {
                        print_conversation_list(&*store.lock().await);
                        continue;
                    }
                    SpecialCommand::Switch(prefix) => {
                        let mut guard = store.lock().await;
                        match guard.find_by_prefix(&prefix) {
                            Some(id) => {
                                guard.set_current_conversation(id);
                                let title = guard
                                    .current_conversation()
                                    .map(|c| c.title.clone())
                                    .unwrap_or_default();
                                println!("Switched to: {}\n", title);
                            }
                            None => println!(
                                "{}",
                                format!("No conversation matches '{}'\n", prefix).yellow()
                            ),
                        }
                        continue;
                    }
                    SpecialCommand::Retry => {
                        handle_retry(&store).await;
                        continue;
                    }
                    SpecialCommand::Clear => {
                        store.lock().await.clear_current_conversation();
                        println!("Conversation cleared\n");
                        continue;
                    }
                    SpecialCommand::Search(query) => {
                        print_search_results(&store.lock().await.search_messages(&query));
                        continue;
                    }
                    SpecialCommand::Stats => {
                        print_stats(&*store.lock().await);
                        continue;
                    }
                    SpecialCommand::Help => {
                        print_help();
                        continue;
                    }
                    SpecialCommand::Unknown(command) => {
                        println!(
                            "{}",
                            format!("Unknown command: {} (try /help)\n", command).yellow()
                        );
                        continue;
                    }
                    SpecialCommand::Exit => break,
                    SpecialCommand::None => {}
                }

                if stream_replies {
                    send_streaming(&store, trimmed, &options).await;
                } else {
                    send_blocking(&store, trimmed, &options).await;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    if let Some(handle) = autosave {
        handle.abort();
    }
    store.lock().await.save_conversations();
    println!("Goodbye!");
    Ok(())
}

/// Send a user turn through the store's non-streaming path
async fn send_blocking(store: &Arc<Mutex<ChatStore>>, content: &str, options: &SendOptions) {
    let result = store
        .lock()
        .await
        .send_message(content, options.clone())
        .await;
    match result {
        Ok(reply) => println!("\n{}\n", reply),
        Err(error) => eprintln!("{}\n", format!("Error: {}", error).red()),
    }
}

/// Send a user turn with the reply streamed to the terminal
///
/// The store's message list is updated exactly as in the non-streaming
/// path: user turn appended before dispatch, assistant turn appended
/// once the stream finishes.
async fn send_streaming(store: &Arc<Mutex<ChatStore>>, content: &str, options: &SendOptions) {
    let mut guard = store.lock().await;
    guard.add_message(ChatMessage::user(content));

    let request = match guard.current_conversation() {
        Some(conversation) => {
            let mut request = ChatRequest::new(
                options
                    .model
                    .clone()
                    .unwrap_or_else(|| conversation.model.clone()),
                conversation.history(),
            );
            request.max_tokens = options
                .max_tokens
                .unwrap_or(conversation.settings.max_tokens);
            request.temperature = options
                .temperature
                .unwrap_or(conversation.settings.temperature);
            request
        }
        None => return,
    };

    println!();
    let result = match guard.service() {
        Some(service) => {
            service
                .send_collected(&request, |fragment| {
                    print!("{}", fragment);
                    let _ = std::io::stdout().flush();
                })
                .await
        }
        None => {
            eprintln!(
                "{}\n",
                "Error: chat service is not configured".red()
            );
            return;
        }
    };

    match result {
        Ok(response) => {
            println!("\n");
            guard.add_message(ChatMessage::assistant(response.content));
        }
        Err(error) => eprintln!("\n{}\n", format!("Error: {}", error).red()),
    }
}

/// Resend the most recent user message
async fn handle_retry(store: &Arc<Mutex<ChatStore>>) {
    let target = {
        let guard = store.lock().await;
        guard.current_conversation().and_then(|conversation| {
            conversation
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.id)
        })
    };

    let Some(id) = target else {
        println!("{}", "Nothing to retry\n".yellow());
        return;
    };

    let result = store.lock().await.retry_message(id).await;
    match result {
        Ok(Some(reply)) => println!("\n{}\n", reply),
        Ok(None) => println!("{}", "Nothing to retry\n".yellow()),
        Err(error) => eprintln!("{}\n", format!("Error: {}", error).red()),
    }
}

/// Display welcome banner at the start of the session
fn print_welcome_banner(model: &str, streaming: bool) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Colloquy - Chat Session                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Model:     {}", model.cyan());
    println!(
        "Streaming: {}\n",
        if streaming { "on".green() } else { "off".yellow() }
    );
    println!("Type '/help' for available commands, 'exit' to quit\n");
}

/// Prompt showing the current conversation's title
fn format_prompt(store: &ChatStore) -> String {
    let title = store
        .current_conversation()
        .map(|c| truncate(&c.title, 24))
        .unwrap_or_else(|| "no conversation".to_string());
    format!("[{}] >> ", title.cyan())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

fn print_conversation_list(store: &ChatStore) {
    println!();
    for conversation in store.conversations() {
        let marker = if Some(conversation.id) == store.current_id() {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        let id = conversation.id.to_string();
        println!(
            "{} {}  {}  ({} messages)",
            marker,
            id[..8].dimmed(),
            truncate(&conversation.title, 40),
            conversation.messages.len()
        );
    }
    println!();
}

fn print_search_results(results: &[SearchMatch]) {
    if results.is_empty() {
        println!("{}", "No matches\n".yellow());
        return;
    }
    println!();
    for result in results {
        println!(
            "{} [{}] {}",
            truncate(&result.conversation_title, 30).cyan(),
            result.message.role,
            truncate(&result.matched, 60)
        );
    }
    println!();
}

fn print_stats(store: &ChatStore) {
    let stats = store.message_stats();
    println!("\nConversations: {}", stats.total_conversations);
    println!(
        "Messages:      {} ({} user / {} assistant)",
        stats.total_messages, stats.user_messages, stats.assistant_messages
    );
    println!(
        "Average:       {} messages per conversation\n",
        stats.average_messages_per_conversation
    );
}
