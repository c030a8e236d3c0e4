// TestDependencies - mock implementations for testing
//
// Provides mock collaborators that can be injected through ServerDeps for
// unit and integration tests. Knobs flip individual calls into failures;
// recorded calls let tests assert on what was sent where.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::deps::ServerDeps;
use super::traits::{
    Account, BaseAccountService, BaseCompanionService, BaseDiscordService, BaseDurableStore,
    BaseMailer, BaseMatrixService, BaseTelegramService,
};
use crate::common::Message;
use crate::domains::identity::{
    DiscordIdentity, EmailContact, MatrixIdentity, TelegramIdentity,
};
use crate::domains::invites::Invite;
use crate::domains::notify::AnnouncementTemplate;
use crate::domains::profiles::Profile;

// =============================================================================
// In-memory durable store
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    invites: Mutex<HashMap<String, Invite>>,
    profiles: Mutex<HashMap<String, Profile>>,
    emails: Mutex<HashMap<String, EmailContact>>,
    discord: Mutex<HashMap<String, DiscordIdentity>>,
    telegram: Mutex<HashMap<String, TelegramIdentity>>,
    matrix: Mutex<HashMap<String, MatrixIdentity>>,
    expiries: Mutex<HashMap<String, DateTime<Utc>>>,
    templates: Mutex<HashMap<String, AnnouncementTemplate>>,
    invite_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the invite collection was written. The sweep persists
    /// at most once per pass; tests check this.
    pub fn invite_writes(&self) -> usize {
        self.invite_writes.load(Ordering::SeqCst)
    }

    pub fn stored_invites(&self) -> HashMap<String, Invite> {
        self.invites.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseDurableStore for MemoryStore {
    async fn load_invites(&self) -> Result<HashMap<String, Invite>> {
        Ok(self.invites.lock().unwrap().clone())
    }

    async fn store_invites(&self, invites: &HashMap<String, Invite>) -> Result<()> {
        self.invite_writes.fetch_add(1, Ordering::SeqCst);
        *self.invites.lock().unwrap() = invites.clone();
        Ok(())
    }

    async fn load_profiles(&self) -> Result<HashMap<String, Profile>> {
        Ok(self.profiles.lock().unwrap().clone())
    }

    async fn store_profiles(&self, profiles: &HashMap<String, Profile>) -> Result<()> {
        *self.profiles.lock().unwrap() = profiles.clone();
        Ok(())
    }

    async fn load_email_contacts(&self) -> Result<HashMap<String, EmailContact>> {
        Ok(self.emails.lock().unwrap().clone())
    }

    async fn store_email_contacts(&self, contacts: &HashMap<String, EmailContact>) -> Result<()> {
        *self.emails.lock().unwrap() = contacts.clone();
        Ok(())
    }

    async fn load_discord_identities(&self) -> Result<HashMap<String, DiscordIdentity>> {
        Ok(self.discord.lock().unwrap().clone())
    }

    async fn store_discord_identities(
        &self,
        identities: &HashMap<String, DiscordIdentity>,
    ) -> Result<()> {
        *self.discord.lock().unwrap() = identities.clone();
        Ok(())
    }

    async fn load_telegram_identities(&self) -> Result<HashMap<String, TelegramIdentity>> {
        Ok(self.telegram.lock().unwrap().clone())
    }

    async fn store_telegram_identities(
        &self,
        identities: &HashMap<String, TelegramIdentity>,
    ) -> Result<()> {
        *self.telegram.lock().unwrap() = identities.clone();
        Ok(())
    }

    async fn load_matrix_identities(&self) -> Result<HashMap<String, MatrixIdentity>> {
        Ok(self.matrix.lock().unwrap().clone())
    }

    async fn store_matrix_identities(
        &self,
        identities: &HashMap<String, MatrixIdentity>,
    ) -> Result<()> {
        *self.matrix.lock().unwrap() = identities.clone();
        Ok(())
    }

    async fn load_account_expiries(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        Ok(self.expiries.lock().unwrap().clone())
    }

    async fn store_account_expiries(
        &self,
        expiries: &HashMap<String, DateTime<Utc>>,
    ) -> Result<()> {
        *self.expiries.lock().unwrap() = expiries.clone();
        Ok(())
    }

    async fn load_templates(&self) -> Result<HashMap<String, AnnouncementTemplate>> {
        Ok(self.templates.lock().unwrap().clone())
    }

    async fn store_templates(
        &self,
        templates: &HashMap<String, AnnouncementTemplate>,
    ) -> Result<()> {
        *self.templates.lock().unwrap() = templates.clone();
        Ok(())
    }
}

// =============================================================================
// Mock account service
// =============================================================================

pub struct MockAccountService {
    accounts: Mutex<HashMap<String, Account>>,
    fail_creation: AtomicBool,
    fail_policy: AtomicBool,
    fail_configuration: AtomicBool,
    policy_calls: AtomicUsize,
    configuration_calls: AtomicUsize,
    display_prefs_calls: AtomicUsize,
}

impl MockAccountService {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            fail_creation: AtomicBool::new(false),
            fail_policy: AtomicBool::new(false),
            fail_configuration: AtomicBool::new(false),
            policy_calls: AtomicUsize::new(0),
            configuration_calls: AtomicUsize::new(0),
            display_prefs_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_creation(self) -> Self {
        self.fail_creation.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_policy(self) -> Self {
        self.fail_policy.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_configuration(self) -> Self {
        self.fail_configuration.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_existing_account(self, name: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            name.to_string(),
            Account {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn policy_calls(&self) -> usize {
        self.policy_calls.load(Ordering::SeqCst)
    }

    pub fn display_prefs_calls(&self) -> usize {
        self.display_prefs_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAccountService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAccountService for MockAccountService {
    async fn create_account(&self, name: &str, _password: &str) -> Result<Account> {
        if self.fail_creation.load(Ordering::SeqCst) {
            return Err(anyhow!("account service unavailable"));
        }
        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(name.to_string(), account.clone());
        Ok(account)
    }

    async fn account_by_name(&self, name: &str) -> Result<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(name).cloned())
    }

    async fn account_by_id(&self, id: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        self.accounts.lock().unwrap().retain(|_, a| a.id != id);
        Ok(())
    }

    async fn set_policy(&self, _id: &str, _policy: &Value) -> Result<()> {
        self.policy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_policy.load(Ordering::SeqCst) {
            return Err(anyhow!("policy rejected"));
        }
        Ok(())
    }

    async fn set_configuration(&self, _id: &str, _configuration: &Value) -> Result<()> {
        self.configuration_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_configuration.load(Ordering::SeqCst) {
            return Err(anyhow!("configuration rejected"));
        }
        Ok(())
    }

    async fn set_display_preferences(&self, _id: &str, _prefs: &Value) -> Result<()> {
        self.display_prefs_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reset_password(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn set_password(&self, _id: &str, _password: &str) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Mock companion service
// =============================================================================

#[derive(Default)]
pub struct MockCompanionService {
    created: Mutex<Vec<String>>,
    prefs_calls: Mutex<Vec<(String, String)>>,
}

impl MockCompanionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_users(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn prefs_calls(&self) -> Vec<(String, String)> {
        self.prefs_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseCompanionService for MockCompanionService {
    async fn create_user(
        &self,
        name: &str,
        _password: &str,
        _email: &str,
        _template: &Value,
    ) -> Result<()> {
        self.created.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn user_for_account(&self, username: &str, _email: &str) -> Result<Option<Value>> {
        if self.created.lock().unwrap().iter().any(|n| n == username) {
            Ok(Some(serde_json::json!({ "userName": username })))
        } else {
            Ok(None)
        }
    }

    async fn modify_user(&self, _user: &Value) -> Result<()> {
        Ok(())
    }

    async fn delete_user(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn template_by_id(&self, _id: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn set_notification_prefs(
        &self,
        _user: &Value,
        discord_id: &str,
        telegram_username: &str,
    ) -> Result<()> {
        self.prefs_calls
            .lock()
            .unwrap()
            .push((discord_id.to_string(), telegram_username.to_string()));
        Ok(())
    }
}

// =============================================================================
// Mock transports
// =============================================================================

#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<(String, Message)>>,
    fail: AtomicBool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn sent(&self) -> Vec<(String, Message)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMailer for MockMailer {
    async fn send(&self, message: &Message, address: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("smtp connection refused"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), message.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDiscordService {
    dms: Mutex<Vec<(String, Message)>>,
    roles_applied: Mutex<Vec<String>>,
    members: Mutex<Vec<DiscordIdentity>>,
    fail_role: AtomicBool,
}

impl MockDiscordService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_role(self) -> Self {
        self.fail_role.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_member(self, identity: DiscordIdentity) -> Self {
        self.members.lock().unwrap().push(identity);
        self
    }

    pub fn dms(&self) -> Vec<(String, Message)> {
        self.dms.lock().unwrap().clone()
    }

    pub fn roles_applied(&self) -> Vec<String> {
        self.roles_applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseDiscordService for MockDiscordService {
    async fn send_direct_message(&self, message: &Message, channel_id: &str) -> Result<()> {
        self.dms
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message.clone()));
        Ok(())
    }

    async fn apply_role(&self, user_id: &str) -> Result<()> {
        if self.fail_role.load(Ordering::SeqCst) {
            return Err(anyhow!("missing role permission"));
        }
        self.roles_applied.lock().unwrap().push(user_id.to_string());
        Ok(())
    }

    async fn find_users(&self, username: &str) -> Result<Vec<DiscordIdentity>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.username == username)
            .cloned()
            .collect())
    }

    async fn create_temp_invite(&self, _ttl_seconds: u32, _max_uses: u32) -> Result<String> {
        Ok("https://discord.gg/mock".to_string())
    }
}

#[derive(Default)]
pub struct MockMatrixService {
    dms: Mutex<Vec<(String, Message)>>,
    rooms_created: Mutex<Vec<String>>,
}

impl MockMatrixService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dms(&self) -> Vec<(String, Message)> {
        self.dms.lock().unwrap().clone()
    }

    pub fn rooms_created(&self) -> Vec<String> {
        self.rooms_created.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMatrixService for MockMatrixService {
    async fn send_direct_message(&self, message: &Message, room_id: &str) -> Result<()> {
        self.dms
            .lock()
            .unwrap()
            .push((room_id.to_string(), message.clone()));
        Ok(())
    }

    async fn create_dm_room(&self, user_id: &str) -> Result<String> {
        self.rooms_created.lock().unwrap().push(user_id.to_string());
        Ok(format!("!dm-{}:mock", user_id))
    }
}

#[derive(Default)]
pub struct MockTelegramService {
    dms: Mutex<Vec<(String, Message)>>,
}

impl MockTelegramService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dms(&self) -> Vec<(String, Message)> {
        self.dms.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseTelegramService for MockTelegramService {
    async fn send_direct_message(&self, message: &Message, chat_id: &str) -> Result<()> {
        self.dms
            .lock()
            .unwrap()
            .push((chat_id.to_string(), message.clone()));
        Ok(())
    }
}

// =============================================================================
// Aggregate
// =============================================================================

/// Bundle of mocks plus the ServerDeps view over them, so tests can both
/// inject and inspect.
pub struct TestDependencies {
    pub store: Arc<MemoryStore>,
    pub accounts: Arc<MockAccountService>,
    pub companion: Arc<MockCompanionService>,
    pub mailer: Arc<MockMailer>,
    pub discord: Arc<MockDiscordService>,
    pub matrix: Arc<MockMatrixService>,
    pub telegram: Arc<MockTelegramService>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            accounts: Arc::new(MockAccountService::new()),
            companion: Arc::new(MockCompanionService::new()),
            mailer: Arc::new(MockMailer::new()),
            discord: Arc::new(MockDiscordService::new()),
            matrix: Arc::new(MockMatrixService::new()),
            telegram: Arc::new(MockTelegramService::new()),
        }
    }

    pub fn with_accounts(mut self, accounts: MockAccountService) -> Self {
        self.accounts = Arc::new(accounts);
        self
    }

    pub fn with_mailer(mut self, mailer: MockMailer) -> Self {
        self.mailer = Arc::new(mailer);
        self
    }

    pub fn with_discord(mut self, discord: MockDiscordService) -> Self {
        self.discord = Arc::new(discord);
        self
    }

    pub fn deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.store.clone(),
            self.accounts.clone(),
            Some(self.companion.clone()),
            self.mailer.clone(),
            self.discord.clone(),
            self.matrix.clone(),
            self.telegram.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
