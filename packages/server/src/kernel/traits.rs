// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The account
// service, companion service, transports and durable store are external
// collaborators; the core only sees these contracts.
//
// Naming convention: Base* for trait names (e.g., BaseAccountService)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::common::Message;
use crate::domains::identity::{
    DiscordIdentity, EmailContact, MatrixIdentity, TelegramIdentity,
};
use crate::domains::invites::Invite;
use crate::domains::notify::AnnouncementTemplate;
use crate::domains::profiles::Profile;

// =============================================================================
// Account service (the managed media server)
// =============================================================================

/// Minimal view of a media-service account.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait BaseAccountService: Send + Sync {
    async fn create_account(&self, name: &str, password: &str) -> Result<Account>;
    async fn account_by_name(&self, name: &str) -> Result<Option<Account>>;
    async fn account_by_id(&self, id: &str) -> Result<Option<Account>>;
    async fn delete_account(&self, id: &str) -> Result<()>;
    async fn set_policy(&self, id: &str, policy: &Value) -> Result<()>;
    async fn set_configuration(&self, id: &str, configuration: &Value) -> Result<()>;
    async fn set_display_preferences(&self, id: &str, prefs: &Value) -> Result<()>;
    async fn reset_password(&self, id: &str) -> Result<()>;
    async fn set_password(&self, id: &str, password: &str) -> Result<()>;
}

// =============================================================================
// Companion request service
// =============================================================================

#[async_trait]
pub trait BaseCompanionService: Send + Sync {
    /// Create a companion user from a stored template.
    async fn create_user(
        &self,
        name: &str,
        password: &str,
        email: &str,
        template: &Value,
    ) -> Result<()>;
    async fn list_users(&self) -> Result<Vec<Value>>;
    /// Find the companion user matching a media-service account (by username
    /// or email).
    async fn user_for_account(&self, username: &str, email: &str) -> Result<Option<Value>>;
    async fn modify_user(&self, user: &Value) -> Result<()>;
    async fn delete_user(&self, id: &str) -> Result<()>;
    async fn template_by_id(&self, id: &str) -> Result<Value>;
    /// Forward chat handles so the companion service can notify the user.
    async fn set_notification_prefs(
        &self,
        user: &Value,
        discord_id: &str,
        telegram_username: &str,
    ) -> Result<()>;
}

// =============================================================================
// Messaging transports
// =============================================================================

#[async_trait]
pub trait BaseMailer: Send + Sync {
    async fn send(&self, message: &Message, address: &str) -> Result<()>;
}

#[async_trait]
pub trait BaseDiscordService: Send + Sync {
    async fn send_direct_message(&self, message: &Message, channel_id: &str) -> Result<()>;
    /// Grant the configured member role after verification.
    async fn apply_role(&self, user_id: &str) -> Result<()>;
    /// Guild members matching a username, for invite delivery by handle.
    async fn find_users(&self, username: &str) -> Result<Vec<DiscordIdentity>>;
    /// Short-lived, limited-use server invite URL.
    async fn create_temp_invite(&self, ttl_seconds: u32, max_uses: u32) -> Result<String>;
}

#[async_trait]
pub trait BaseMatrixService: Send + Sync {
    async fn send_direct_message(&self, message: &Message, room_id: &str) -> Result<()>;
    /// Open a direct-message room with a user, returning the room id.
    async fn create_dm_room(&self, user_id: &str) -> Result<String>;
}

#[async_trait]
pub trait BaseTelegramService: Send + Sync {
    async fn send_direct_message(&self, message: &Message, chat_id: &str) -> Result<()>;
}

// =============================================================================
// Durable store
// =============================================================================

/// Keyed-record persistence, one collection at a time. No transactional
/// guarantee across collections; callers persist related collections
/// independently and tolerate partial writes on crash.
#[async_trait]
pub trait BaseDurableStore: Send + Sync {
    async fn load_invites(&self) -> Result<HashMap<String, Invite>>;
    async fn store_invites(&self, invites: &HashMap<String, Invite>) -> Result<()>;

    async fn load_profiles(&self) -> Result<HashMap<String, Profile>>;
    async fn store_profiles(&self, profiles: &HashMap<String, Profile>) -> Result<()>;

    async fn load_email_contacts(&self) -> Result<HashMap<String, EmailContact>>;
    async fn store_email_contacts(&self, contacts: &HashMap<String, EmailContact>) -> Result<()>;

    async fn load_discord_identities(&self) -> Result<HashMap<String, DiscordIdentity>>;
    async fn store_discord_identities(
        &self,
        identities: &HashMap<String, DiscordIdentity>,
    ) -> Result<()>;

    async fn load_telegram_identities(&self) -> Result<HashMap<String, TelegramIdentity>>;
    async fn store_telegram_identities(
        &self,
        identities: &HashMap<String, TelegramIdentity>,
    ) -> Result<()>;

    async fn load_matrix_identities(&self) -> Result<HashMap<String, MatrixIdentity>>;
    async fn store_matrix_identities(
        &self,
        identities: &HashMap<String, MatrixIdentity>,
    ) -> Result<()>;

    async fn load_account_expiries(&self) -> Result<HashMap<String, DateTime<Utc>>>;
    async fn store_account_expiries(
        &self,
        expiries: &HashMap<String, DateTime<Utc>>,
    ) -> Result<()>;

    async fn load_templates(&self) -> Result<HashMap<String, AnnouncementTemplate>>;
    async fn store_templates(
        &self,
        templates: &HashMap<String, AnnouncementTemplate>,
    ) -> Result<()>;
}
