//! Capability-tagged provider gates.

use std::sync::Arc;

use super::models::Provider;
use super::registry::PinRegistry;
use crate::config::ProvisioningSettings;
use crate::domains::invites::InviteStore;

/// One verification provider as seen by the orchestrator: enablement flags
/// plus the registry holding its pending PINs.
#[derive(Clone)]
pub struct ProviderGate {
    pub provider: Provider,
    pub enabled: bool,
    pub required: bool,
    pub registry: Arc<PinRegistry>,
}

/// Build the fixed ordered gate list (Discord, Matrix, Telegram).
pub fn provider_gates(
    settings: &ProvisioningSettings,
    discord: Arc<PinRegistry>,
    matrix: Arc<PinRegistry>,
    telegram: Arc<PinRegistry>,
) -> Vec<ProviderGate> {
    vec![
        ProviderGate {
            provider: Provider::Discord,
            enabled: settings.discord.enabled,
            required: settings.discord.required,
            registry: discord,
        },
        ProviderGate {
            provider: Provider::Matrix,
            enabled: settings.matrix.enabled,
            required: settings.matrix.required,
            registry: matrix,
        },
        ProviderGate {
            provider: Provider::Telegram,
            enabled: settings.telegram.enabled,
            required: settings.telegram.required,
            registry: telegram,
        },
    ]
}

/// Polling check used by the landing page: is this PIN verified yet?
/// Requires a live invite code so the endpoint cannot be used to probe PINs.
pub fn check_verified_for_invite(invites: &InviteStore, registry: &PinRegistry, code: &str, pin: &str) -> bool {
    if !invites.contains(code) {
        return false;
    }
    registry.check_verified(pin).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::invites::Invite;
    use crate::domains::verification::VerifiedIdentity;
    use crate::kernel::test_dependencies::MemoryStore;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_verified_check_requires_live_invite() {
        let invites = InviteStore::empty(std::sync::Arc::new(MemoryStore::new()));
        let now = Utc::now();
        invites
            .create("abc", Invite::single_use(now, now + Duration::hours(1)))
            .await
            .unwrap();

        let registry = PinRegistry::new(Provider::Discord);
        let pin = registry.issue_pin(None);
        registry.mark_verified(
            &pin,
            VerifiedIdentity {
                provider: Provider::Discord,
                user_id: "u1".to_string(),
                username: "alice".to_string(),
                channel_id: "c1".to_string(),
            },
        );

        assert!(check_verified_for_invite(&invites, &registry, "abc", &pin));
        // same PIN, dead invite code: no information leaks
        assert!(!check_verified_for_invite(&invites, &registry, "nope", &pin));
        assert!(!check_verified_for_invite(&invites, &registry, "abc", "XXXXXX"));
    }

    #[test]
    fn test_gate_order_is_fixed() {
        use crate::config::ProvisioningSettings;
        use std::sync::Arc;

        let gates = provider_gates(
            &ProvisioningSettings::default(),
            Arc::new(PinRegistry::new(Provider::Discord)),
            Arc::new(PinRegistry::new(Provider::Matrix)),
            Arc::new(PinRegistry::new(Provider::Telegram)),
        );
        let order: Vec<Provider> = gates.iter().map(|g| g.provider).collect();
        assert_eq!(
            order,
            vec![Provider::Discord, Provider::Matrix, Provider::Telegram]
        );
    }
}
