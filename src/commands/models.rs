//! Model listing and account lookup commands

use crate::api::ChatService;
use crate::error::Result;

use prettytable::{row, Table};

/// List available models
///
/// # Arguments
///
/// * `json` - Print raw JSON instead of a table
pub async fn list_models(json: bool) -> Result<()> {
    let settings = super::load_settings_store()?;
    let service = ChatService::new(settings.settings().api_config())?;

    let models = service.list_models().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["ID", "OWNER", "CREATED"]);
    for model in &models {
        table.add_row(row![
            model.id,
            model.owned_by.as_deref().unwrap_or("-"),
            model
                .created
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.printstd();
    Ok(())
}

/// Show account information
pub async fn show_account() -> Result<()> {
    let settings = super::load_settings_store()?;
    let service = ChatService::new(settings.settings().api_config())?;

    let account = service.get_account().await?;
    println!("Account: {}", account.id);
    if let Some(name) = &account.name {
        println!("Name:    {}", name);
    }
    if let Some(email) = &account.email {
        println!("Email:   {}", email);
    }
    Ok(())
}
