use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named bundle of settings applied to accounts created through an invite.
///
/// The account-service payloads (policy, homescreen configuration, display
/// preferences) are opaque to this core; `Null` means "not set".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Marks the fallback profile used when an invite names a missing one.
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub policy: Value,
    #[serde(default)]
    pub configuration: Value,
    #[serde(default)]
    pub display_prefs: Value,
    /// Companion-service user template, applied after account configuration.
    #[serde(default)]
    pub companion_template: Value,
}

impl Profile {
    pub fn has_policy(&self) -> bool {
        !self.policy.is_null()
    }

    /// Homescreen needs both halves: configuration and display preferences.
    pub fn has_homescreen(&self) -> bool {
        !self.configuration.is_null() && !self.display_prefs.is_null()
    }

    pub fn has_companion_template(&self) -> bool {
        !self.companion_template.is_null()
    }
}
