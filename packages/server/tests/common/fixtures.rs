//! Settings and data fixtures for integration tests.

use chrono::{Duration, Utc};
use server_core::common::ServerState;
use server_core::config::{ProviderSettings, ProvisioningSettings};
use server_core::domains::invites::{Invite, NotifyPrefs};
use server_core::domains::provisioning::ProvisioningRequest;
use server_core::domains::verification::{Provider, VerifiedIdentity};

/// Minimal settings: no email, no providers, no confirmation.
pub fn base_settings() -> ProvisioningSettings {
    ProvisioningSettings {
        external_url: "https://media.example.com".to_string(),
        ..ProvisioningSettings::default()
    }
}

pub fn email_settings() -> ProvisioningSettings {
    ProvisioningSettings {
        email_enabled: true,
        notifications_enabled: true,
        welcome_message: true,
        ..base_settings()
    }
}

pub fn confirmation_settings() -> ProvisioningSettings {
    ProvisioningSettings {
        email_confirmation: true,
        ..email_settings()
    }
}

pub fn discord_required_settings() -> ProvisioningSettings {
    ProvisioningSettings {
        discord: ProviderSettings {
            enabled: true,
            required: true,
        },
        ..base_settings()
    }
}

/// Seed an invite with `uses` remaining uses, valid for an hour.
pub async fn seed_invite(state: &ServerState, code: &str, uses: u32) {
    let now = Utc::now();
    let mut invite = Invite::single_use(now, now + Duration::hours(1));
    invite.remaining_uses = uses;
    state.invites.create(code, invite).await.expect("seed invite");
}

/// Seed an invite that expired in the past.
pub async fn seed_expired_invite(state: &ServerState, code: &str, notify_addr: Option<&str>) {
    let now = Utc::now();
    let mut invite = Invite::single_use(now - Duration::hours(2), now - Duration::hours(1));
    if let Some(addr) = notify_addr {
        invite.notify.insert(
            addr.to_string(),
            NotifyPrefs {
                on_expiry: true,
                on_creation: false,
            },
        );
    }
    state.invites.create(code, invite).await.expect("seed invite");
}

/// Issue and verify a PIN on the given provider's registry.
pub fn verified_pin(state: &ServerState, provider: Provider, user_id: &str) -> String {
    let registry = state.registry_for(provider);
    let pin = registry.issue_pin(None);
    registry.mark_verified(
        &pin,
        VerifiedIdentity {
            provider,
            user_id: user_id.to_string(),
            username: format!("{}-name", user_id),
            channel_id: format!("chan-{}", user_id),
        },
    );
    pin
}

pub fn request(code: &str, username: &str) -> ProvisioningRequest {
    ProvisioningRequest {
        code: code.to_string(),
        username: username.to_string(),
        password: "p1".to_string(),
        ..ProvisioningRequest::default()
    }
}
