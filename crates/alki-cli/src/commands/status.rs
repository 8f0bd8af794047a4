//! Status command handler

use anyhow::Result;

use alki_core::{Backend, Config, Session, SyncMode};

use crate::output::{Output, OutputFormat};

/// Show session status
pub fn show(session: &Session, config: &Config, output: &Output) -> Result<()> {
    let status = session.status();
    let selected = session.selected_id();
    let unsynced = session.unsynced_ids();
    let last_error = session.last_error();
    let location = match config.backend {
        Backend::Http => config.api_url.clone(),
        Backend::File => config.store_path().display().to_string(),
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "status": status,
                    "mode": session.mode(),
                    "backend": config.backend,
                    "location": location,
                    "items": session.len(),
                    "selected": selected,
                    "unsynced": unsynced,
                    "last_error": last_error,
                    "quiet_period_ms": config.quiet_period_ms
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", status);
        }
        OutputFormat::Human => {
            println!("Alki Status");
            println!("===========");
            println!();
            println!("Collection:");
            println!("  Status:   {}", status);
            println!(
                "  Mode:     {}",
                match session.mode() {
                    SyncMode::Remote => "remote",
                    SyncMode::Local => "local (nothing is sent)",
                }
            );
            println!("  Source:   {}", location);
            println!();
            println!("Contents:");
            println!("  Items:    {}", session.len());
            if let Some(ref id) = selected {
                println!("  Selected: {}", id);
            }
            if !unsynced.is_empty() {
                let ids: Vec<_> = unsynced.iter().map(|id| id.as_str()).collect();
                println!("  Unsynced: {}", ids.join(", "));
            }
            if let Some(ref failure) = last_error {
                println!();
                println!("Last error:");
                println!("  {}", failure);
            }
        }
    }

    Ok(())
}
