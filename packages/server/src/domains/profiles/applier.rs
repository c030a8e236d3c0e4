//! Best-effort application of a profile to a freshly created account.
//!
//! The account already exists by the time this runs, so every aspect is
//! attempted independently and failures are reported, never raised.

use tracing::{debug, error};

use super::models::Profile;
use crate::kernel::{BaseAccountService, BaseCompanionService};

/// Result of applying one aspect of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectOutcome {
    /// The profile carried nothing for this aspect.
    Skipped,
    Applied,
    Failed(String),
}

impl AspectOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, AspectOutcome::Failed(_))
    }
}

/// Per-aspect report so the caller can log partial failure without treating
/// it as fatal.
#[derive(Debug, Clone)]
pub struct ProfileApplyReport {
    pub policy: AspectOutcome,
    pub homescreen: AspectOutcome,
    pub companion: AspectOutcome,
}

impl ProfileApplyReport {
    pub fn failures(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        for (aspect, outcome) in [
            ("policy", &self.policy),
            ("homescreen", &self.homescreen),
            ("companion", &self.companion),
        ] {
            if let AspectOutcome::Failed(reason) = outcome {
                out.push((aspect, reason.clone()));
            }
        }
        out
    }
}

/// Apply a profile to an account: policy, then homescreen (configuration
/// followed by display preferences), then the companion-service template.
pub async fn apply_profile(
    accounts: &dyn BaseAccountService,
    companion: Option<&dyn BaseCompanionService>,
    account_id: &str,
    username: &str,
    password: &str,
    email: &str,
    profile: &Profile,
) -> ProfileApplyReport {
    let policy = if profile.has_policy() {
        debug!("Applying policy to account {}", account_id);
        match accounts.set_policy(account_id, &profile.policy).await {
            Ok(()) => AspectOutcome::Applied,
            Err(e) => {
                error!("Failed to set account policy: {}", e);
                AspectOutcome::Failed(e.to_string())
            }
        }
    } else {
        AspectOutcome::Skipped
    };

    let homescreen = if profile.has_homescreen() {
        debug!("Applying homescreen to account {}", account_id);
        let result = match accounts
            .set_configuration(account_id, &profile.configuration)
            .await
        {
            // Display preferences only make sense on top of an applied
            // configuration.
            Ok(()) => {
                accounts
                    .set_display_preferences(account_id, &profile.display_prefs)
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => AspectOutcome::Applied,
            Err(e) => {
                error!("Failed to set homescreen template: {}", e);
                AspectOutcome::Failed(e.to_string())
            }
        }
    } else {
        AspectOutcome::Skipped
    };

    let companion_outcome = match (companion, profile.has_companion_template()) {
        (Some(companion), true) => {
            debug!("Creating companion user for {}", username);
            match companion
                .create_user(username, password, email, &profile.companion_template)
                .await
            {
                Ok(()) => AspectOutcome::Applied,
                Err(e) => {
                    error!("Failed to create companion user: {}", e);
                    AspectOutcome::Failed(e.to_string())
                }
            }
        }
        _ => AspectOutcome::Skipped,
    };

    ProfileApplyReport {
        policy,
        homescreen,
        companion: companion_outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockAccountService;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_profile_skips_everything() {
        let accounts = MockAccountService::new();
        let report = apply_profile(
            &accounts,
            None,
            "id1",
            "alice",
            "pw",
            "",
            &Profile::default(),
        )
        .await;
        assert_eq!(report.policy, AspectOutcome::Skipped);
        assert_eq!(report.homescreen, AspectOutcome::Skipped);
        assert_eq!(report.companion, AspectOutcome::Skipped);
        assert!(report.failures().is_empty());
    }

    #[tokio::test]
    async fn test_policy_failure_does_not_block_homescreen() {
        let accounts = MockAccountService::new().failing_policy();
        let profile = Profile {
            policy: json!({"k": 1}),
            configuration: json!({"home": []}),
            display_prefs: json!({"prefs": {}}),
            ..Profile::default()
        };
        let report = apply_profile(&accounts, None, "id1", "alice", "pw", "", &profile).await;
        assert!(report.policy.is_failure());
        assert_eq!(report.homescreen, AspectOutcome::Applied);
        assert_eq!(report.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_display_prefs_skipped_when_configuration_fails() {
        let accounts = MockAccountService::new().failing_configuration();
        let profile = Profile {
            configuration: json!({"home": []}),
            display_prefs: json!({"prefs": {}}),
            ..Profile::default()
        };
        let report = apply_profile(&accounts, None, "id1", "alice", "pw", "", &profile).await;
        assert!(report.homescreen.is_failure());
        assert_eq!(accounts.display_prefs_calls(), 0);
    }
}
