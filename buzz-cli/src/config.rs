//! Configuration management for the buzz CLI.
//!
//! Three files live in the data directory:
//! - `profile.json`: the local actor's identity (0600).
//! - `contacts.json`: the target directory for buzz dispatch.
//! - `buzzline.toml`: settings - relay host and optional store credentials.

use anyhow::{Context, Result};
use buzz_client::config::{ActorProfile, DEFAULT_RELAY_HOST};
use buzz_types::{ActorId, Target};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The local actor's identity, stored locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Stable actor identifier.
    pub actor_id: String,
    /// Display name attached to outgoing buzzes and events.
    pub name: String,
    /// When the profile was created (Unix seconds).
    pub created_at: u64,
}

impl ProfileConfig {
    /// Create a new profile with a fresh actor id.
    pub fn new(name: &str) -> Self {
        Self {
            actor_id: ActorId::new().to_string(),
            name: name.to_string(),
            created_at: unix_seconds(),
        }
    }

    /// Load the profile from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("profile.json");
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Profile not initialized. Run 'buzz init' first.")?;
        serde_json::from_str(&contents).context("Invalid profile file")
    }

    /// Save the profile to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("profile.json");
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save profile")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Check if a profile exists.
    pub async fn exists(data_dir: &Path) -> bool {
        data_dir.join("profile.json").exists()
    }

    /// Convert to the client-side actor profile.
    pub fn actor(&self) -> Result<ActorProfile> {
        let id = ActorId::parse(&self.actor_id).context("Profile has an invalid actor id")?;
        Ok(ActorProfile::with_id(id, &self.name))
    }

    /// Short display form of the actor id.
    ///
    /// The file on disk is hand-editable, so cut on a char boundary rather
    /// than assuming eight ASCII bytes are there.
    pub fn short_id(&self) -> &str {
        match self.actor_id.char_indices().nth(8) {
            Some((idx, _)) => &self.actor_id[..idx],
            None => &self.actor_id,
        }
    }
}

/// One saved contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEntry {
    /// Display name used on the command line.
    pub name: String,
    /// Relay endpoint key.
    pub endpoint_key: String,
}

/// File-backed target directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactBook {
    /// Saved contacts, in insertion order.
    pub contacts: Vec<ContactEntry>,
}

impl ContactBook {
    /// Load the contact book, or an empty one if none exists yet.
    pub async fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("contacts.json");
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).context("Invalid contacts file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context("Failed to read contacts file"),
        }
    }

    /// Save the contact book.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("contacts.json");
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save contacts")
    }

    /// Add a contact. `key_or_url` may be a bare endpoint key or a pasted
    /// relay URL; the key is extracted either way.
    pub fn add(&mut self, name: &str, key_or_url: &str, relay_host: &str) -> Result<Target> {
        if self.contacts.iter().any(|c| c.name == name) {
            anyhow::bail!("Contact {:?} already exists", name);
        }
        let target = Target::from_key_or_url(name, key_or_url, relay_host);
        if target.endpoint_key.is_empty() {
            anyhow::bail!("No endpoint key found in {:?}", key_or_url);
        }
        self.contacts.push(ContactEntry {
            name: target.display_name.clone(),
            endpoint_key: target.endpoint_key.clone(),
        });
        Ok(target)
    }

    /// Remove a contact by name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.contacts.len();
        self.contacts.retain(|c| c.name != name);
        self.contacts.len() != before
    }

    /// Resolve the named contacts as dispatch targets, erroring on any
    /// unknown name.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Target>> {
        names
            .iter()
            .map(|name| {
                self.contacts
                    .iter()
                    .find(|c| &c.name == name)
                    .map(|c| Target::new(&c.name, &c.endpoint_key))
                    .with_context(|| format!("Unknown contact {:?}", name))
            })
            .collect()
    }

    /// Every saved contact as a dispatch target.
    pub fn all_targets(&self) -> Vec<Target> {
        self.contacts
            .iter()
            .map(|c| Target::new(&c.name, &c.endpoint_key))
            .collect()
    }
}

/// Relay settings section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Push relay base host.
    #[serde(default = "default_relay_host")]
    pub host: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
        }
    }
}

fn default_relay_host() -> String {
    DEFAULT_RELAY_HOST.to_string()
}

/// Store settings section. Absence selects offline mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL of the store's REST endpoint.
    pub url: String,
    /// API key sent with every request.
    pub key: String,
}

/// Settings file (`buzzline.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Push relay settings.
    #[serde(default)]
    pub relay: RelaySettings,
    /// Optional store credentials.
    #[serde(default)]
    pub store: Option<StoreSettings>,
}

impl Settings {
    /// Load settings, or defaults if the file does not exist.
    pub async fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("buzzline.toml");
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => toml::from_str(&contents).context("Invalid settings file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context("Failed to read settings file"),
        }
    }
}

fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
