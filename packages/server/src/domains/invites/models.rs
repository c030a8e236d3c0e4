use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::add_offset;

/// Per-administrator notification preferences attached to an invite.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyPrefs {
    #[serde(default)]
    pub on_expiry: bool,
    #[serde(default)]
    pub on_creation: bool,
}

/// One successful consumption of an invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteUsage {
    pub identity: String,
    pub at: DateTime<Utc>,
}

/// Expiry offset applied to accounts created through an invite, not to the
/// invite itself.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserExpiryOffset {
    #[serde(default)]
    pub months: u32,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

impl UserExpiryOffset {
    pub fn apply_to(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        add_offset(now, self.months, self.days, self.hours, self.minutes)
    }
}

/// A self-provisioning grant, keyed by an unguessable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    #[serde(default)]
    pub label: String,
    pub created: DateTime<Utc>,
    pub valid_till: DateTime<Utc>,
    /// Positive use counter; 0 is the "unlimited" sentinel when `no_limit`
    /// is set.
    #[serde(default)]
    pub remaining_uses: u32,
    #[serde(default)]
    pub no_limit: bool,
    /// Name of the profile to apply to created accounts; empty applies
    /// nothing.
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub user_expiry: Option<UserExpiryOffset>,
    /// Append-only record of successful consumptions.
    #[serde(default)]
    pub used_by: Vec<InviteUsage>,
    /// Administrator address -> notification preferences.
    #[serde(default)]
    pub notify: HashMap<String, NotifyPrefs>,
    /// Where the invite was sent at creation time, or a delivery-failure
    /// note. Diagnostic only.
    #[serde(default)]
    pub send_to: String,
    /// Confirmation tokens issued against this invite (audit trail).
    #[serde(default)]
    pub keys: Vec<String>,
}

impl Invite {
    /// A single-use invite valid until `valid_till`.
    pub fn single_use(created: DateTime<Utc>, valid_till: DateTime<Utc>) -> Self {
        Self {
            label: String::new(),
            created,
            valid_till,
            remaining_uses: 1,
            no_limit: false,
            profile: String::new(),
            user_expiry: None,
            used_by: Vec::new(),
            notify: HashMap::new(),
            send_to: String::new(),
            keys: Vec::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_till <= now
    }

    /// Administrators subscribed to expiry notifications for this invite.
    pub fn expiry_subscribers(&self) -> Vec<String> {
        let mut subs: Vec<String> = self
            .notify
            .iter()
            .filter(|(_, prefs)| prefs.on_expiry)
            .map(|(addr, _)| addr.clone())
            .collect();
        subs.sort();
        subs
    }

    /// Administrators subscribed to creation notifications for this invite.
    pub fn creation_subscribers(&self) -> Vec<String> {
        let mut subs: Vec<String> = self
            .notify
            .iter()
            .filter(|(_, prefs)| prefs.on_creation)
            .map(|(addr, _)| addr.clone())
            .collect();
        subs.sort();
        subs
    }
}
