//! Item command handlers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use alki_core::{ItemId, ItemPatch, Session, SyncFailure};

use crate::output::Output;

/// Field values for `edit`; each field can come inline or from a file
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// New type
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// New HTML source
    #[arg(long, conflicts_with = "html_file")]
    pub html: Option<String>,
    /// Read the HTML source from a file
    #[arg(long, value_name = "PATH")]
    pub html_file: Option<PathBuf>,
    /// New CSS source
    #[arg(long, conflicts_with = "css_file")]
    pub css: Option<String>,
    /// Read the CSS source from a file
    #[arg(long, value_name = "PATH")]
    pub css_file: Option<PathBuf>,
    /// New JS source
    #[arg(long, conflicts_with = "js_file")]
    pub js: Option<String>,
    /// Read the JS source from a file
    #[arg(long, value_name = "PATH")]
    pub js_file: Option<PathBuf>,
    /// Combined source overriding html/css/js ("" clears it)
    #[arg(long, conflicts_with = "all_file")]
    pub all: Option<String>,
    /// Read the combined source from a file
    #[arg(long, value_name = "PATH")]
    pub all_file: Option<PathBuf>,
}

impl FieldArgs {
    /// Build the patch these arguments describe
    pub fn into_patch(self) -> Result<ItemPatch> {
        Ok(ItemPatch {
            name: self.name,
            kind: self.kind,
            html: field(self.html, self.html_file.as_deref())?,
            css: field(self.css, self.css_file.as_deref())?,
            js: field(self.js, self.js_file.as_deref())?,
            all: field(self.all, self.all_file.as_deref())?,
        })
    }
}

fn field(inline: Option<String>, file: Option<&Path>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(value), _) => Ok(Some(value)),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, None) => Ok(None),
    }
}

/// List all items
pub fn list(session: &Session, output: &Output) -> Result<()> {
    let selected = session.selected_id();
    output.print_items(&session.items(), selected.as_ref());
    Ok(())
}

/// Show one item, or the selected one
pub fn show(session: &Session, id: Option<String>, output: &Output) -> Result<()> {
    let item = match id {
        Some(id) => session
            .get(&ItemId::from(id.as_str()))
            .ok_or_else(|| anyhow::anyhow!("Item not found: {}", id))?,
        None => session
            .current_item()
            .ok_or_else(|| anyhow::anyhow!("No items"))?,
    };

    let unsynced = session.is_unsynced(&item.id);
    output.print_item(&item, unsynced);
    Ok(())
}

/// Create a new item
pub async fn add(
    session: &Session,
    name: Option<String>,
    kind: String,
    output: &Output,
) -> Result<()> {
    let Some(item) = session.add_with_type(name.as_deref(), &kind).await else {
        bail!("Failed to create item: {}", failure_reason(session.last_error()));
    };

    output.success(&format!("Created item: {} ({})", item.id, item.name));
    output.print_item(&item, false);
    Ok(())
}

/// Edit fields of an item and write the change
pub async fn edit(session: &Session, id: String, fields: FieldArgs, output: &Output) -> Result<()> {
    let id = ItemId::from(id.as_str());
    if session.get(&id).is_none() {
        bail!("Item not found: {}", id);
    }

    let patch = fields.into_patch()?;
    if patch.is_empty() {
        bail!("Nothing to change. Pass at least one of --name, --type, --html, --css, --js, --all.");
    }

    session.update(&id, patch);
    write(session, &id, output).await?;

    if let Some(item) = session.get(&id) {
        output.print_item(&item, session.is_unsynced(&id));
    }
    Ok(())
}

/// Write the full state of an item again
pub async fn save(session: &Session, id: String, output: &Output) -> Result<()> {
    let id = ItemId::from(id.as_str());
    if !session.save(&id) {
        bail!("Item not found: {}", id);
    }
    write(session, &id, output).await
}

/// Remove an item
pub async fn remove(session: &Session, id: String, local: bool, output: &Output) -> Result<()> {
    let id = ItemId::from(id.as_str());
    if session.get(&id).is_none() {
        bail!("Item not found: {}", id);
    }
    if session.len() <= 1 {
        bail!("Cannot remove the last item.");
    }

    let removed = if local {
        session.remove_local(&id)
    } else {
        session.remove(&id).await
    };

    if !removed {
        bail!("Failed to remove item {}: {}", id, failure_reason(session.last_error()));
    }

    if local {
        output.success(&format!("Removed item {} from this session", id));
    } else {
        output.success(&format!("Removed item {}", id));
    }
    Ok(())
}

/// Send the pending write for `id` without waiting for the quiet period
async fn write(session: &Session, id: &ItemId, output: &Output) -> Result<()> {
    match session.queue().flush_now(id).await {
        Some(true) => output.success(&format!("Saved item {}", id)),
        Some(false) => {
            bail!("Failed to write item {}: {}", id, failure_reason(session.last_error()))
        }
        None => output.message(&format!("Item {} changed locally (local mode, nothing sent)", id)),
    }
    Ok(())
}

fn failure_reason(failure: Option<SyncFailure>) -> String {
    failure
        .map(|f| f.message)
        .unwrap_or_else(|| "unknown error".to_string())
}
