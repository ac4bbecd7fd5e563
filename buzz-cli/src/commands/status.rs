//! Show profile, contacts, and channel mode.

use anyhow::Result;
use std::path::Path;

use crate::config::{ContactBook, ProfileConfig, Settings};

/// Run the status command.
pub async fn run(data_dir: &Path) -> Result<()> {
    println!("=== buzz status ===");
    println!();

    match ProfileConfig::load(data_dir).await {
        Ok(profile) => {
            println!("Profile:");
            println!("  ID:      {}", profile.short_id());
            println!("  Name:    {}", profile.name);
            println!("  Created: {}", format_timestamp(profile.created_at));
        }
        Err(_) => {
            println!("Profile: NOT INITIALIZED");
            println!();
            println!("Run 'buzz init --name <name>' to get started.");
            return Ok(());
        }
    }

    println!();

    let book = ContactBook::load_or_default(data_dir).await?;
    println!("Contacts: {} saved", book.contacts.len());

    println!();

    let settings = Settings::load_or_default(data_dir).await?;
    println!("Relay: {}", settings.relay.host);
    match &settings.store {
        Some(store) => {
            println!("Groups: realtime mode ({})", store.url);
        }
        None => {
            println!("Groups: offline mode (simulated peers)");
        }
    }

    Ok(())
}

/// Format a Unix timestamp as a human-readable string.
fn format_timestamp(ts: u64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let diff = now.saturating_sub(ts);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
