//! Shared application state: stores, registries and services wired over the
//! injected dependencies. One instance lives for the process lifetime and is
//! cloned (cheaply, everything is Arc'd) into request handlers and tasks.

use anyhow::Result;
use std::sync::Arc;

use crate::config::ProvisioningSettings;
use crate::domains::confirmation::ConfirmationTokenService;
use crate::domains::identity::{AccountExpiryStore, IdentityStore};
use crate::domains::invites::InviteStore;
use crate::domains::notify::{NotificationDispatcher, TemplateStore};
use crate::domains::profiles::ProfileStore;
use crate::domains::verification::{PinRegistry, Provider};
use crate::kernel::ServerDeps;

#[derive(Clone)]
pub struct ServerState {
    pub deps: ServerDeps,
    pub settings: ProvisioningSettings,
    pub invites: Arc<InviteStore>,
    pub profiles: Arc<ProfileStore>,
    pub identities: Arc<IdentityStore>,
    pub expiries: Arc<AccountExpiryStore>,
    pub templates: Arc<TemplateStore>,
    pub discord_registry: Arc<PinRegistry>,
    pub matrix_registry: Arc<PinRegistry>,
    pub telegram_registry: Arc<PinRegistry>,
    pub confirmation: Arc<ConfirmationTokenService>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl ServerState {
    /// Load every persisted collection and wire up services.
    pub async fn initialize(
        deps: ServerDeps,
        settings: ProvisioningSettings,
        token_secret: &str,
    ) -> Result<Self> {
        let invites = Arc::new(InviteStore::load(deps.durable.clone()).await?);
        let profiles = Arc::new(ProfileStore::load(deps.durable.clone()).await?);
        let identities = Arc::new(IdentityStore::load(deps.durable.clone()).await?);
        let expiries = Arc::new(AccountExpiryStore::load(deps.durable.clone()).await?);
        let templates = Arc::new(TemplateStore::load(deps.durable.clone()).await?);
        let dispatcher = Arc::new(NotificationDispatcher::new(deps.clone(), identities.clone()));

        Ok(Self {
            deps,
            settings,
            invites,
            profiles,
            identities,
            expiries,
            templates,
            discord_registry: Arc::new(PinRegistry::new(Provider::Discord)),
            matrix_registry: Arc::new(PinRegistry::new(Provider::Matrix)),
            telegram_registry: Arc::new(PinRegistry::new(Provider::Telegram)),
            confirmation: Arc::new(ConfirmationTokenService::new(token_secret)),
            dispatcher,
        })
    }

    pub fn registry_for(&self, provider: Provider) -> &Arc<PinRegistry> {
        match provider {
            Provider::Discord => &self.discord_registry,
            Provider::Matrix => &self.matrix_registry,
            Provider::Telegram => &self.telegram_registry,
        }
    }
}
