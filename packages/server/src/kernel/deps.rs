//! Server dependencies (using traits for testability)
//!
//! Central dependency container handed to domain logic. All external
//! services sit behind trait abstractions so tests can inject mocks.

use std::sync::Arc;

use super::traits::{
    BaseAccountService, BaseCompanionService, BaseDiscordService, BaseDurableStore, BaseMailer,
    BaseMatrixService, BaseTelegramService,
};

/// Server dependencies accessible to domain logic
#[derive(Clone)]
pub struct ServerDeps {
    pub durable: Arc<dyn BaseDurableStore>,
    pub accounts: Arc<dyn BaseAccountService>,
    /// Companion request service (optional — not all deployments link one)
    pub companion: Option<Arc<dyn BaseCompanionService>>,
    pub mailer: Arc<dyn BaseMailer>,
    pub discord: Arc<dyn BaseDiscordService>,
    pub matrix: Arc<dyn BaseMatrixService>,
    pub telegram: Arc<dyn BaseTelegramService>,
}

impl ServerDeps {
    pub fn new(
        durable: Arc<dyn BaseDurableStore>,
        accounts: Arc<dyn BaseAccountService>,
        companion: Option<Arc<dyn BaseCompanionService>>,
        mailer: Arc<dyn BaseMailer>,
        discord: Arc<dyn BaseDiscordService>,
        matrix: Arc<dyn BaseMatrixService>,
        telegram: Arc<dyn BaseTelegramService>,
    ) -> Self {
        Self {
            durable,
            accounts,
            companion,
            mailer,
            discord,
            matrix,
            telegram,
        }
    }
}
