//! Settings inspection and change commands

use crate::cli::ConfigCommand;
use crate::error::Result;

use colored::Colorize;

/// Handle a `config` subcommand
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    let mut store = super::load_settings_store()?;

    match command {
        ConfigCommand::Show => {
            let exported = store.export_settings();
            println!("{}", serde_json::to_string_pretty(&exported["settings"])?);
        }
        ConfigCommand::Set { key, value } => {
            store.update_setting(&key, &value)?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommand::Validate => {
            let violations = store.validate_settings();
            if violations.is_empty() {
                println!("{}", "Settings are valid".green());
            } else {
                println!("{}", "Settings have problems:".yellow());
                for violation in violations {
                    println!("  - {}", violation);
                }
            }
        }
        ConfigCommand::Reset => {
            store.reset_settings();
            println!("Settings restored to defaults");
        }
        ConfigCommand::Usage => {
            let usage = store.storage_usage();
            println!("Used: {} of {} bytes ({:.2}%)", usage.used, usage.max, usage.percentage);
            println!("  settings:      {} bytes", usage.breakdown.settings);
            println!("  conversations: {} bytes", usage.breakdown.conversations);
            println!("  theme:         {} bytes", usage.breakdown.theme);
        }
        ConfigCommand::ClearData => {
            let report = store.clear_all_data();
            if report.success {
                println!("{}", report.message.green());
            } else {
                println!("{}", report.message.red());
            }
        }
    }
    Ok(())
}
