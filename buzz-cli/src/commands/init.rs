//! Create the local actor profile.

use anyhow::Result;
use std::path::Path;

use crate::config::ProfileConfig;

/// Run the init command.
pub async fn run(data_dir: &Path, name: &str) -> Result<()> {
    if ProfileConfig::exists(data_dir).await {
        anyhow::bail!(
            "Profile already exists. Delete {} to start over.",
            data_dir.join("profile.json").display()
        );
    }

    let profile = ProfileConfig::new(name);
    profile.save(data_dir).await?;

    println!("Profile created!");
    println!();
    println!("  Actor ID: {}", profile.short_id());
    println!("  Name:     {}", profile.name);
    println!("  Data dir: {}", data_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Save a contact:  buzz contact add <name> <endpoint-key>");
    println!("  2. Buzz them:       buzz send \"on my way\" --to <name>");
    println!("  3. Or start a group: buzz group create <name>");

    Ok(())
}
