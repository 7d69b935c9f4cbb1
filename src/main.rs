//! Colloquy - terminal chat client
//!
#![doc = "Colloquy - terminal chat client for MiniMax-compatible AI APIs"]
#![doc = "Main entry point for the Colloquy application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use colloquy::cli::{Cli, Commands};
use colloquy::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // If the user supplied a storage path on the CLI (or via env),
    // mirror it into COLLOQUY_DATA_DB so the storage initializer can
    // pick it up.
    if let Some(db_path) = &cli.data_db {
        std::env::set_var("COLLOQUY_DATA_DB", db_path);
        tracing::info!("Using storage DB override: {}", db_path);
    }

    match cli.command {
        Commands::Chat {
            model,
            no_stream,
            resume,
        } => {
            tracing::info!("Starting interactive chat session");
            commands::chat::run_chat(model, no_stream, resume).await?;
            Ok(())
        }
        Commands::Models { json } => {
            commands::models::list_models(json).await?;
            Ok(())
        }
        Commands::Account => {
            commands::models::show_account().await?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(command)?;
            Ok(())
        }
        Commands::Export { id, format, output } => {
            commands::transfer::handle_export(&id, &format, output)?;
            Ok(())
        }
        Commands::Import { path, format } => {
            commands::transfer::handle_import(&path, format.as_deref())?;
            Ok(())
        }
        Commands::Config { command } => {
            commands::settings_cmd::handle_config(command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "colloquy=debug" } else { "colloquy=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
