//! Conversation export and import commands

use crate::error::{ColloquyError, Result};
use crate::export::{
    export_conversation, generate_export_filename, parse_import, sanitize_filename, ExportFormat,
};

use std::path::{Path, PathBuf};

/// Export one conversation to a file
///
/// # Arguments
///
/// * `id` - Conversation id (full UUID or prefix)
/// * `format` - Export format name
/// * `output` - Destination path; generated from the title when omitted
pub fn handle_export(id: &str, format: &str, output: Option<PathBuf>) -> Result<()> {
    let settings = super::load_settings_store()?;
    let store = super::load_chat_store(&settings)?;
    let format = ExportFormat::parse_str(format);

    let conversation_id = store
        .find_by_prefix(id)
        .ok_or_else(|| ColloquyError::Malformed(format!("no conversation matches '{}'", id)))?;
    let Some(conversation) = store.conversation(conversation_id) else {
        return Ok(());
    };

    let serialized = export_conversation(conversation, format)?;
    let path = output.unwrap_or_else(|| {
        let stem = sanitize_filename(&conversation.title);
        if stem.is_empty() {
            PathBuf::from(generate_export_filename("conversation", format))
        } else {
            PathBuf::from(format!("{}.{}", stem, format.extension()))
        }
    });

    std::fs::write(&path, serialized)?;
    println!("Exported {} to {}", conversation_id, path.display());
    Ok(())
}

/// Import a conversation from a file
///
/// The format is inferred from the file extension unless given
/// explicitly.
pub fn handle_import(path: &Path, format: Option<&str>) -> Result<()> {
    let settings = super::load_settings_store()?;
    let mut store = super::load_chat_store(&settings)?;

    let format = match format {
        Some(name) => ExportFormat::parse_str(name),
        None => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(ExportFormat::from_extension)
            .unwrap_or_default(),
    };

    let contents = std::fs::read_to_string(path)?;
    let snapshot = parse_import(&contents, format)?;
    let id = store.import_conversation(&snapshot)?;
    store.save_conversations();

    let title = store
        .conversation(id)
        .map(|c| c.title.clone())
        .unwrap_or_default();
    println!("Imported '{}' as {}", title, id);
    Ok(())
}
