//! JSON-file implementation of the durable store.
//!
//! One file per collection under a data directory. A missing file reads as
//! an empty collection; writes replace the whole file. Collections are
//! independent on disk, matching the no-cross-collection-transaction
//! contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::traits::BaseDurableStore;
use crate::domains::identity::{
    DiscordIdentity, EmailContact, MatrixIdentity, TelegramIdentity,
};
use crate::domains::invites::Invite;
use crate::domains::notify::AnnouncementTemplate;
use crate::domains::profiles::Profile;

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<HashMap<String, T>> {
        let path = self.dir.join(format!("{}.json", name));
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn write<T: Serialize>(&self, name: &str, records: &HashMap<String, T>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.dir.join(format!("{}.json", name));
        let bytes = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[async_trait]
impl BaseDurableStore for JsonFileStore {
    async fn load_invites(&self) -> Result<HashMap<String, Invite>> {
        self.read("invites").await
    }

    async fn store_invites(&self, invites: &HashMap<String, Invite>) -> Result<()> {
        self.write("invites", invites).await
    }

    async fn load_profiles(&self) -> Result<HashMap<String, Profile>> {
        self.read("profiles").await
    }

    async fn store_profiles(&self, profiles: &HashMap<String, Profile>) -> Result<()> {
        self.write("profiles", profiles).await
    }

    async fn load_email_contacts(&self) -> Result<HashMap<String, EmailContact>> {
        self.read("emails").await
    }

    async fn store_email_contacts(&self, contacts: &HashMap<String, EmailContact>) -> Result<()> {
        self.write("emails", contacts).await
    }

    async fn load_discord_identities(&self) -> Result<HashMap<String, DiscordIdentity>> {
        self.read("discord").await
    }

    async fn store_discord_identities(
        &self,
        identities: &HashMap<String, DiscordIdentity>,
    ) -> Result<()> {
        self.write("discord", identities).await
    }

    async fn load_telegram_identities(&self) -> Result<HashMap<String, TelegramIdentity>> {
        self.read("telegram").await
    }

    async fn store_telegram_identities(
        &self,
        identities: &HashMap<String, TelegramIdentity>,
    ) -> Result<()> {
        self.write("telegram", identities).await
    }

    async fn load_matrix_identities(&self) -> Result<HashMap<String, MatrixIdentity>> {
        self.read("matrix").await
    }

    async fn store_matrix_identities(
        &self,
        identities: &HashMap<String, MatrixIdentity>,
    ) -> Result<()> {
        self.write("matrix", identities).await
    }

    async fn load_account_expiries(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        self.read("users").await
    }

    async fn store_account_expiries(
        &self,
        expiries: &HashMap<String, DateTime<Utc>>,
    ) -> Result<()> {
        self.write("users", expiries).await
    }

    async fn load_templates(&self) -> Result<HashMap<String, AnnouncementTemplate>> {
        self.read("announcements").await
    }

    async fn store_templates(
        &self,
        templates: &HashMap<String, AnnouncementTemplate>,
    ) -> Result<()> {
        self.write("announcements", templates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_invites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invites_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let now = Utc::now();
        let mut invites = HashMap::new();
        invites.insert(
            "X7K2".to_string(),
            Invite::single_use(now, now + Duration::days(1)),
        );
        store.store_invites(&invites).await.unwrap();

        let reloaded = store.load_invites().await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded["X7K2"].remaining_uses, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("invites.json"), b"{nope")
            .await
            .unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_invites().await.is_err());
    }
}
