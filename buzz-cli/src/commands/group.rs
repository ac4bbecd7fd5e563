//! Create or join a group channel.

use anyhow::{Context, Result};
use buzz_client::{ChannelConfig, ChannelError, GroupChannel, GroupHandle, OfflineWorld};
use buzz_types::{Event, EventKind, JoinCode};
use std::path::Path;

use crate::config::{ProfileConfig, Settings};

/// Run the group create command.
pub async fn create(data_dir: &Path, name: &str, listen: bool) -> Result<()> {
    let (channel, _world) = build_channel(data_dir).await?;

    let group = channel.create(name).await?;
    println!("Group {:?} created ({:?} mode)", group.name(), channel.mode());
    println!();
    println!("  Join code: {}", group.join_code());
    println!();
    println!("Share the code; others join with: buzz group join {}", group.join_code());

    if listen {
        listen_loop(&channel, &group).await?;
    }
    Ok(())
}

/// Run the group join command.
pub async fn join(data_dir: &Path, code: &str, listen: bool) -> Result<()> {
    let code = JoinCode::parse(code).context("Join codes are 4 digits, e.g. 4242")?;
    let (channel, _world) = build_channel(data_dir).await?;

    let group = match channel.join(&code).await {
        Ok(group) => group,
        Err(ChannelError::NotFound(code)) => {
            // Not fatal: the caller retypes the code and tries again.
            println!("No group found with code {}. Check the code and try again.", code);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Joined {:?} ({:?} mode)", group.name(), channel.mode());
    let recent = group.feed().await;
    if !recent.is_empty() {
        println!();
        println!("Recent activity:");
        for event in recent.iter().take(5) {
            println!("  {}", render_event(event));
        }
    }

    if listen {
        listen_loop(&channel, &group).await?;
    }
    Ok(())
}

/// Build a channel from local settings; store credentials select realtime
/// mode, their absence (or an unusable store) selects offline.
async fn build_channel(data_dir: &Path) -> Result<(GroupChannel, OfflineWorld)> {
    let profile = ProfileConfig::load(data_dir).await?;
    let settings = Settings::load_or_default(data_dir).await?;

    let mut config = ChannelConfig::new(profile.actor()?);
    if let Some(store) = &settings.store {
        config = config.with_store(&store.url, &store.key);
    }

    // The world must outlive the channel; offline groups live inside it.
    let world = OfflineWorld::with_simulator(config.simulator);
    let channel = GroupChannel::connect(config, &world);
    Ok((channel, world))
}

/// Subscribe and print incoming events until Ctrl-C.
async fn listen_loop(channel: &GroupChannel, group: &GroupHandle) -> Result<()> {
    let subscription = channel
        .subscribe(group, |event| {
            println!("{}", render_event(event));
        })
        .await?;

    println!();
    println!("Listening for events (Ctrl-C to stop)...");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl-C")?;

    subscription.cancel();
    println!();
    println!("Unsubscribed.");
    Ok(())
}

fn render_event(event: &Event) -> String {
    let tag = match event.kind {
        EventKind::Buzz => "buzz",
        EventKind::Message => "msg ",
        EventKind::System => "sys ",
    };
    format!("[{}] {}: {}", tag, event.sender_name, event.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buzz_types::ActorId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_without_profile_fails() {
        let dir = tempdir().unwrap();
        assert!(create(dir.path(), "Standup", false).await.is_err());
    }

    #[tokio::test]
    async fn join_with_malformed_code_fails() {
        let dir = tempdir().unwrap();
        ProfileConfig::new("Ann").save(dir.path()).await.unwrap();

        assert!(join(dir.path(), "12", false).await.is_err());
    }

    #[tokio::test]
    async fn join_with_unknown_code_is_not_fatal() {
        let dir = tempdir().unwrap();
        ProfileConfig::new("Ann").save(dir.path()).await.unwrap();

        // Offline world is empty, so any valid code is unknown.
        join(dir.path(), "4242", false).await.unwrap();
    }

    #[tokio::test]
    async fn create_prints_a_usable_code() {
        let dir = tempdir().unwrap();
        ProfileConfig::new("Ann").save(dir.path()).await.unwrap();

        create(dir.path(), "Standup", false).await.unwrap();
    }

    #[test]
    fn event_rendering() {
        let event = Event::buzz(ActorId::new(), "Ann", "on my way");
        assert_eq!(render_event(&event), "[buzz] Ann: on my way");
    }
}
