//! Guarded invite collection.
//!
//! The store is the single writer of record for invites. All mutation goes
//! through these methods so the atomic-decrement and delete-on-last-use
//! invariants hold under concurrent consumption. The in-memory lock is never
//! held across an await; persistence writes a cloned snapshot afterwards.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error};

use super::models::{Invite, InviteUsage, NotifyPrefs};
use crate::kernel::BaseDurableStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("invite code \"{0}\" already exists")]
    DuplicateCode(String),
}

pub struct InviteStore {
    invites: Mutex<HashMap<String, Invite>>,
    durable: Arc<dyn BaseDurableStore>,
}

impl InviteStore {
    /// Load the invite collection from the durable store.
    pub async fn load(durable: Arc<dyn BaseDurableStore>) -> anyhow::Result<Self> {
        let invites = durable.load_invites().await?;
        Ok(Self {
            invites: Mutex::new(invites),
            durable,
        })
    }

    #[cfg(test)]
    pub fn empty(durable: Arc<dyn BaseDurableStore>) -> Self {
        Self {
            invites: Mutex::new(HashMap::new()),
            durable,
        }
    }

    pub async fn create(&self, code: &str, invite: Invite) -> Result<(), InviteError> {
        {
            let mut invites = self.invites.lock().unwrap();
            if invites.contains_key(code) {
                return Err(InviteError::DuplicateCode(code.to_string()));
            }
            invites.insert(code.to_string(), invite);
        }
        self.persist().await;
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<Invite> {
        self.invites.lock().unwrap().get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.invites.lock().unwrap().contains_key(code)
    }

    /// All invites, sorted by code for deterministic iteration.
    pub fn list(&self) -> Vec<(String, Invite)> {
        let mut all: Vec<(String, Invite)> = self
            .invites
            .lock()
            .unwrap()
            .iter()
            .map(|(c, i)| (c.clone(), i.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub async fn delete(&self, code: &str) -> bool {
        let removed = self.invites.lock().unwrap().remove(code).is_some();
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Check that an invite exists and is unexpired. An expired invite is
    /// deleted as a side effect and the check fails.
    pub async fn validate(&self, code: &str, now: DateTime<Utc>) -> bool {
        let (valid, changed) = {
            let mut invites = self.invites.lock().unwrap();
            match invites.get(code) {
                None => (false, false),
                Some(inv) if inv.is_expired(now) => {
                    debug!("Housekeeping: deleting expired invite {}", code);
                    invites.remove(code);
                    (false, true)
                }
                Some(_) => (true, false),
            }
        };
        if changed {
            self.persist().await;
        }
        valid
    }

    /// Atomically record one successful consumption.
    ///
    /// Checks expiry, decrements the use count (deleting the invite when the
    /// last use is spent), and appends to `used_by`. Returns whether the
    /// invite was valid at consumption time.
    pub async fn consume(&self, code: &str, identity: &str, now: DateTime<Utc>) -> bool {
        let (valid, changed) = {
            let mut invites = self.invites.lock().unwrap();
            match invites.get_mut(code) {
                None => (false, false),
                Some(inv) if inv.is_expired(now) => {
                    debug!("Housekeeping: deleting expired invite {}", code);
                    invites.remove(code);
                    (false, true)
                }
                Some(inv) => {
                    if inv.remaining_uses == 1 && !inv.no_limit {
                        invites.remove(code);
                    } else {
                        // 0 with no_limit is the unlimited sentinel; never
                        // decrement below it.
                        if !inv.no_limit && inv.remaining_uses > 1 {
                            inv.remaining_uses -= 1;
                        }
                        inv.used_by.push(InviteUsage {
                            identity: identity.to_string(),
                            at: now,
                        });
                    }
                    (true, true)
                }
            }
        };
        if changed {
            self.persist().await;
        }
        valid
    }

    /// Snapshot of expired invites without mutating them. The sweep decides
    /// what to do with each.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<(String, Invite)> {
        let mut expired: Vec<(String, Invite)> = self
            .invites
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, inv)| inv.is_expired(now))
            .map(|(c, i)| (c.clone(), i.clone()))
            .collect();
        expired.sort_by(|a, b| a.0.cmp(&b.0));
        expired
    }

    /// Delete a batch of codes, persisting once. Used by the sweep.
    pub async fn remove(&self, codes: &[String]) -> usize {
        let removed = {
            let mut invites = self.invites.lock().unwrap();
            codes
                .iter()
                .filter(|code| invites.remove(code.as_str()).is_some())
                .count()
        };
        if removed > 0 {
            self.persist().await;
        }
        removed
    }

    /// Append an issued confirmation token to the invite's key list.
    pub async fn append_confirmation_key(&self, code: &str, key: &str) -> bool {
        let appended = {
            let mut invites = self.invites.lock().unwrap();
            match invites.get_mut(code) {
                Some(inv) => {
                    inv.keys.push(key.to_string());
                    true
                }
                None => false,
            }
        };
        if appended {
            self.persist().await;
        }
        appended
    }

    /// Record where the invite was sent (or a delivery-failure note).
    pub async fn set_send_to(&self, code: &str, send_to: &str) -> bool {
        let updated = {
            let mut invites = self.invites.lock().unwrap();
            match invites.get_mut(code) {
                Some(inv) => {
                    inv.send_to = send_to.to_string();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist().await;
        }
        updated
    }

    /// Upsert one administrator's notification preferences on an invite.
    pub async fn set_notify(&self, code: &str, address: &str, prefs: NotifyPrefs) -> bool {
        let updated = {
            let mut invites = self.invites.lock().unwrap();
            match invites.get_mut(code) {
                Some(inv) => {
                    inv.notify.insert(address.to_string(), prefs);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist().await;
        }
        updated
    }

    async fn persist(&self) {
        let snapshot = self.invites.lock().unwrap().clone();
        if let Err(e) = self.durable.store_invites(&snapshot).await {
            error!("Failed to store invites: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MemoryStore;
    use chrono::Duration;

    fn store() -> InviteStore {
        InviteStore::empty(Arc::new(MemoryStore::new()))
    }

    fn invite(uses: u32, valid_for: Duration) -> (Invite, DateTime<Utc>) {
        let now = Utc::now();
        let mut inv = Invite::single_use(now, now + valid_for);
        inv.remaining_uses = uses;
        (inv, now)
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_code() {
        let store = store();
        let (inv, _) = invite(1, Duration::hours(1));
        store.create("abc", inv.clone()).await.unwrap();
        assert_eq!(
            store.create("abc", inv).await,
            Err(InviteError::DuplicateCode("abc".to_string()))
        );
    }

    #[tokio::test]
    async fn test_single_use_invite_deleted_on_consumption() {
        let store = store();
        let (inv, now) = invite(1, Duration::hours(1));
        store.create("abc", inv).await.unwrap();
        assert!(store.consume("abc", "alice", now).await);
        assert!(store.get("abc").is_none());
        assert!(!store.consume("abc", "bob", now).await);
    }

    #[tokio::test]
    async fn test_multi_use_invite_counts_down() {
        let store = store();
        let (inv, now) = invite(3, Duration::hours(1));
        store.create("abc", inv).await.unwrap();

        assert!(store.consume("abc", "a", now).await);
        assert_eq!(store.get("abc").unwrap().remaining_uses, 2);
        assert_eq!(store.get("abc").unwrap().used_by.len(), 1);

        assert!(store.consume("abc", "b", now).await);
        assert!(store.consume("abc", "c", now).await);
        assert!(store.get("abc").is_none());
        assert!(!store.consume("abc", "d", now).await);
    }

    #[tokio::test]
    async fn test_unlimited_invite_never_decrements() {
        let store = store();
        let (mut inv, now) = invite(0, Duration::hours(1));
        inv.no_limit = true;
        store.create("abc", inv).await.unwrap();

        for i in 0..10 {
            assert!(store.consume("abc", &format!("user{}", i), now).await);
        }
        let inv = store.get("abc").unwrap();
        assert_eq!(inv.remaining_uses, 0);
        assert_eq!(inv.used_by.len(), 10);
    }

    #[tokio::test]
    async fn test_validate_deletes_expired_invite() {
        let store = store();
        let (inv, now) = invite(5, Duration::hours(1));
        store.create("abc", inv).await.unwrap();

        assert!(store.validate("abc", now).await);
        assert!(!store.validate("abc", now + Duration::hours(2)).await);
        assert!(store.get("abc").is_none());
    }

    #[tokio::test]
    async fn test_consume_fails_on_expired_invite() {
        let store = store();
        let (inv, now) = invite(5, Duration::hours(1));
        store.create("abc", inv).await.unwrap();
        assert!(!store.consume("abc", "late", now + Duration::hours(2)).await);
        assert!(store.get("abc").is_none());
    }

    #[tokio::test]
    async fn test_expired_snapshot_does_not_mutate() {
        let store = store();
        let (inv, now) = invite(1, Duration::hours(1));
        store.create("old", inv).await.unwrap();
        let (inv, _) = invite(1, Duration::hours(3));
        store.create("new", inv).await.unwrap();

        let expired = store.expired(now + Duration::hours(2));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, "old");
        // snapshot only; both invites still present
        assert!(store.get("old").is_some());
        assert!(store.get("new").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_consumption_never_overconsumes() {
        let store = Arc::new(store());
        let (inv, now) = invite(5, Duration::hours(1));
        store.create("abc", inv).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.consume("abc", &format!("u{}", i), now).await
            }));
        }
        let mut successes = 0;
        for h in handles {
            if h.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 5);
        assert!(store.get("abc").is_none());
    }
}
