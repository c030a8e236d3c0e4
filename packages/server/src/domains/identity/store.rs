//! Guarded identity maps, persisted per collection.
//!
//! Each collection is written independently; there is no cross-collection
//! transaction, so a crash between writes leaves collections individually
//! consistent (tolerated by design of the durable store).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::error;

use super::models::{DiscordIdentity, EmailContact, MatrixIdentity, TelegramIdentity};
use crate::kernel::BaseDurableStore;

pub struct IdentityStore {
    email: Mutex<HashMap<String, EmailContact>>,
    discord: Mutex<HashMap<String, DiscordIdentity>>,
    telegram: Mutex<HashMap<String, TelegramIdentity>>,
    matrix: Mutex<HashMap<String, MatrixIdentity>>,
    durable: Arc<dyn BaseDurableStore>,
}

impl IdentityStore {
    pub async fn load(durable: Arc<dyn BaseDurableStore>) -> anyhow::Result<Self> {
        Ok(Self {
            email: Mutex::new(durable.load_email_contacts().await?),
            discord: Mutex::new(durable.load_discord_identities().await?),
            telegram: Mutex::new(durable.load_telegram_identities().await?),
            matrix: Mutex::new(durable.load_matrix_identities().await?),
            durable,
        })
    }

    #[cfg(test)]
    pub fn empty(durable: Arc<dyn BaseDurableStore>) -> Self {
        Self {
            email: Mutex::new(HashMap::new()),
            discord: Mutex::new(HashMap::new()),
            telegram: Mutex::new(HashMap::new()),
            matrix: Mutex::new(HashMap::new()),
            durable,
        }
    }

    pub async fn set_email_contact(&self, account_id: &str, contact: EmailContact) {
        let snapshot = {
            let mut email = self.email.lock().unwrap();
            email.insert(account_id.to_string(), contact);
            email.clone()
        };
        if let Err(e) = self.durable.store_email_contacts(&snapshot).await {
            error!("Failed to store email contacts: {}", e);
        }
    }

    pub async fn link_discord(&self, account_id: &str, identity: DiscordIdentity) {
        let snapshot = {
            let mut discord = self.discord.lock().unwrap();
            discord.insert(account_id.to_string(), identity);
            discord.clone()
        };
        if let Err(e) = self.durable.store_discord_identities(&snapshot).await {
            error!("Failed to store Discord identities: {}", e);
        }
    }

    pub async fn link_telegram(&self, account_id: &str, identity: TelegramIdentity) {
        let snapshot = {
            let mut telegram = self.telegram.lock().unwrap();
            telegram.insert(account_id.to_string(), identity);
            telegram.clone()
        };
        if let Err(e) = self.durable.store_telegram_identities(&snapshot).await {
            error!("Failed to store Telegram identities: {}", e);
        }
    }

    pub async fn link_matrix(&self, account_id: &str, identity: MatrixIdentity) {
        let snapshot = {
            let mut matrix = self.matrix.lock().unwrap();
            matrix.insert(account_id.to_string(), identity);
            matrix.clone()
        };
        if let Err(e) = self.durable.store_matrix_identities(&snapshot).await {
            error!("Failed to store Matrix identities: {}", e);
        }
    }

    pub fn email_for(&self, account_id: &str) -> Option<EmailContact> {
        self.email.lock().unwrap().get(account_id).cloned()
    }

    pub fn discord_for(&self, account_id: &str) -> Option<DiscordIdentity> {
        self.discord.lock().unwrap().get(account_id).cloned()
    }

    pub fn telegram_for(&self, account_id: &str) -> Option<TelegramIdentity> {
        self.telegram.lock().unwrap().get(account_id).cloned()
    }

    pub fn matrix_for(&self, account_id: &str) -> Option<MatrixIdentity> {
        self.matrix.lock().unwrap().get(account_id).cloned()
    }
}

/// Account-expiry bookkeeping.
///
/// Deliberately a distinct resource with its own lock: recording an expiry
/// must never contend with, or wait on, invite mutation or outbound sends.
/// The lock is only ever held around the in-memory map; persistence happens
/// on a cloned snapshot.
pub struct AccountExpiryStore {
    expiries: Mutex<HashMap<String, DateTime<Utc>>>,
    durable: Arc<dyn BaseDurableStore>,
}

impl AccountExpiryStore {
    pub async fn load(durable: Arc<dyn BaseDurableStore>) -> anyhow::Result<Self> {
        Ok(Self {
            expiries: Mutex::new(durable.load_account_expiries().await?),
            durable,
        })
    }

    #[cfg(test)]
    pub fn empty(durable: Arc<dyn BaseDurableStore>) -> Self {
        Self {
            expiries: Mutex::new(HashMap::new()),
            durable,
        }
    }

    pub async fn record(&self, account_id: &str, expiry: DateTime<Utc>) {
        let snapshot = {
            let mut expiries = self.expiries.lock().unwrap();
            expiries.insert(account_id.to_string(), expiry);
            expiries.clone()
        };
        if let Err(e) = self.durable.store_account_expiries(&snapshot).await {
            error!("Failed to store account expiries: {}", e);
        }
    }

    pub fn get(&self, account_id: &str) -> Option<DateTime<Utc>> {
        self.expiries.lock().unwrap().get(account_id).copied()
    }

    pub async fn remove(&self, account_id: &str) {
        let snapshot = {
            let mut expiries = self.expiries.lock().unwrap();
            if expiries.remove(account_id).is_none() {
                return;
            }
            expiries.clone()
        };
        if let Err(e) = self.durable.store_account_expiries(&snapshot).await {
            error!("Failed to store account expiries: {}", e);
        }
    }
}
