//! Manage the saved contact directory.

use anyhow::Result;
use std::path::Path;

use crate::config::{ContactBook, Settings};

/// Save a contact. `key` may be a bare endpoint key or a pasted relay URL.
pub async fn add(data_dir: &Path, name: &str, key: &str) -> Result<()> {
    let settings = Settings::load_or_default(data_dir).await?;
    let mut book = ContactBook::load_or_default(data_dir).await?;

    let target = book.add(name, key, &settings.relay.host)?;
    book.save(data_dir).await?;

    println!(
        "Saved {} ({}...)",
        target.display_name,
        truncate_key(&target.endpoint_key)
    );
    Ok(())
}

/// List saved contacts.
pub async fn list(data_dir: &Path) -> Result<()> {
    let book = ContactBook::load_or_default(data_dir).await?;

    if book.contacts.is_empty() {
        println!("No contacts saved.");
        println!("Add one with: buzz contact add <name> <endpoint-key>");
        return Ok(());
    }

    println!("Contacts ({}):", book.contacts.len());
    for contact in &book.contacts {
        println!("  {:<16} {}...", contact.name, truncate_key(&contact.endpoint_key));
    }
    Ok(())
}

/// Remove a contact by name.
pub async fn remove(data_dir: &Path, name: &str) -> Result<()> {
    let mut book = ContactBook::load_or_default(data_dir).await?;

    if !book.remove(name) {
        anyhow::bail!("No contact named {:?}", name);
    }
    book.save(data_dir).await?;

    println!("Removed {}", name);
    Ok(())
}

// Endpoint keys are user-supplied, so cut on a char boundary.
fn truncate_key(key: &str) -> &str {
    match key.char_indices().nth(6) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn add_list_remove_cycle() {
        let dir = tempdir().unwrap();

        add(dir.path(), "Bob", "abc123").await.unwrap();
        list(dir.path()).await.unwrap();
        remove(dir.path(), "Bob").await.unwrap();

        let book = ContactBook::load_or_default(dir.path()).await.unwrap();
        assert!(book.contacts.is_empty());
    }

    #[tokio::test]
    async fn removing_unknown_contact_fails() {
        let dir = tempdir().unwrap();
        assert!(remove(dir.path(), "Nobody").await.is_err());
    }

    #[test]
    fn truncate_handles_short_keys() {
        assert_eq!(truncate_key("ab"), "ab");
        assert_eq!(truncate_key("abcdefgh"), "abcdef");
    }

    #[test]
    fn truncate_handles_multibyte_keys() {
        assert_eq!(truncate_key("ключключ"), "ключкл");
        assert_eq!(truncate_key("日本語"), "日本語");
    }
}
