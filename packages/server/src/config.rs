use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Per-provider verification toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderSettings {
    pub enabled: bool,
    /// When set, provisioning fails unless a verified PIN for this provider
    /// accompanies the request.
    pub required: bool,
}

/// Feature toggles consulted by the provisioning orchestrator and the
/// notification paths. Every channel is independently switchable.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningSettings {
    pub email_enabled: bool,
    /// Gate account creation behind a confirmed email link.
    pub email_confirmation: bool,
    /// Admin notifications (invite expiry / account creation).
    pub notifications_enabled: bool,
    /// Send a welcome message to freshly created accounts.
    pub welcome_message: bool,
    /// Send the invite itself to a `send_to` address at creation time.
    pub invite_messages: bool,
    pub companion_enabled: bool,
    /// Base URL embedded in confirmation and invite links.
    pub external_url: String,
    pub discord: ProviderSettings,
    pub matrix: ProviderSettings,
    pub telegram: ProviderSettings,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HS256 secret for confirmation tokens.
    pub token_secret: String,
    /// Directory holding the JSON record collections.
    pub data_dir: PathBuf,
    /// Cron expression for the invite housekeeping sweep.
    pub sweep_schedule: String,
    pub settings: ProvisioningSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            token_secret: env::var("ANTEROOM_SECRET").context("ANTEROOM_SECRET must be set")?,
            data_dir: env::var("ANTEROOM_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            // Every 30 minutes by default
            sweep_schedule: env::var("ANTEROOM_SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 */30 * * * *".to_string()),
            settings: ProvisioningSettings {
                email_enabled: env_bool("ANTEROOM_EMAIL_ENABLED", false),
                email_confirmation: env_bool("ANTEROOM_EMAIL_CONFIRMATION", false),
                notifications_enabled: env_bool("ANTEROOM_NOTIFICATIONS_ENABLED", false),
                welcome_message: env_bool("ANTEROOM_WELCOME_MESSAGE", false),
                invite_messages: env_bool("ANTEROOM_INVITE_MESSAGES", false),
                companion_enabled: env_bool("ANTEROOM_COMPANION_ENABLED", false),
                external_url: env::var("ANTEROOM_EXTERNAL_URL").unwrap_or_default(),
                discord: ProviderSettings {
                    enabled: env_bool("ANTEROOM_DISCORD_ENABLED", false),
                    required: env_bool("ANTEROOM_DISCORD_REQUIRED", false),
                },
                matrix: ProviderSettings {
                    enabled: env_bool("ANTEROOM_MATRIX_ENABLED", false),
                    required: env_bool("ANTEROOM_MATRIX_REQUIRED", false),
                },
                telegram: ProviderSettings {
                    enabled: env_bool("ANTEROOM_TELEGRAM_ENABLED", false),
                    required: env_bool("ANTEROOM_TELEGRAM_REQUIRED", false),
                },
            },
        })
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}
