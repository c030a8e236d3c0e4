use serde::Deserialize;

use crate::domains::verification::{Provider, VerifiedIdentity};

/// An inbound self-provisioning request: invite code, credentials, and zero
/// or more per-provider verification PINs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningRequest {
    pub code: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub discord_pin: String,
    #[serde(default)]
    pub matrix_pin: String,
    #[serde(default)]
    pub telegram_pin: String,
    /// Whether the linked identity may be used as a contact channel.
    #[serde(default = "default_true")]
    pub discord_contact: bool,
    #[serde(default = "default_true")]
    pub matrix_contact: bool,
    #[serde(default = "default_true")]
    pub telegram_contact: bool,
}

// Contact flags default on, matching the wire default.
impl Default for ProvisioningRequest {
    fn default() -> Self {
        Self {
            code: String::new(),
            username: String::new(),
            password: String::new(),
            email: String::new(),
            discord_pin: String::new(),
            matrix_pin: String::new(),
            telegram_pin: String::new(),
            discord_contact: true,
            matrix_contact: true,
            telegram_contact: true,
        }
    }
}

impl ProvisioningRequest {
    pub fn pin_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::Discord => &self.discord_pin,
            Provider::Matrix => &self.matrix_pin,
            Provider::Telegram => &self.telegram_pin,
        }
    }

    pub fn contact_for(&self, provider: Provider) -> bool {
        match provider {
            Provider::Discord => self.discord_contact,
            Provider::Matrix => self.matrix_contact,
            Provider::Telegram => self.telegram_contact,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A provider verification that passed the check step. Carries the PIN so
/// the link step can consume it from the registry exactly once.
#[derive(Debug, Clone)]
pub struct VerifiedPin {
    pub provider: Provider,
    pub pin: String,
    pub identity: VerifiedIdentity,
    pub contact: bool,
}

/// One post-creation problem. The account exists; these are diagnostic.
#[derive(Debug, Clone)]
pub struct ConfigFailure {
    pub stage: String,
    pub detail: String,
}

/// Accumulated best-effort failures from the post-creation steps.
#[derive(Debug, Clone, Default)]
pub struct ProvisionDiagnostics {
    pub failures: Vec<ConfigFailure>,
}

impl ProvisionDiagnostics {
    pub fn record(&mut self, stage: &str, detail: impl Into<String>) {
        self.failures.push(ConfigFailure {
            stage: stage.to_string(),
            detail: detail.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Successful outcomes of a provisioning invocation.
#[derive(Debug)]
pub enum ProvisionStatus {
    /// The account exists and is usable, even if some settings failed.
    Created {
        account_id: String,
        diagnostics: ProvisionDiagnostics,
    },
    /// Suspended pending email confirmation; not an error.
    ConfirmationPending,
}
