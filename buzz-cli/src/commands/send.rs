//! Buzz one or more contacts through the push relay.

use anyhow::Result;
use buzz_client::config::DispatchConfig;
use buzz_client::{BuzzDispatcher, HttpRelay};
use std::path::Path;

use crate::config::{ContactBook, ProfileConfig, Settings};

/// Run the send command.
pub async fn run(data_dir: &Path, message: &str, to: &[String], all: bool) -> Result<()> {
    let profile = ProfileConfig::load(data_dir).await?;
    let settings = Settings::load_or_default(data_dir).await?;
    let book = ContactBook::load_or_default(data_dir).await?;

    let targets = if all {
        book.all_targets()
    } else {
        book.resolve(to)?
    };
    if targets.is_empty() {
        anyhow::bail!("No targets. Use --to <name> or --all, and save contacts first.");
    }

    let relay = HttpRelay::new(DispatchConfig::new(&settings.relay.host))?;
    let dispatcher = BuzzDispatcher::new(relay);

    let report = dispatcher.dispatch(message, &targets, &profile.name).await?;

    println!("{}", report.summary());
    for failure in &report.failed {
        println!("  {} failed: {}", failure.display_name, failure.reason);
    }
    Ok(())
}
