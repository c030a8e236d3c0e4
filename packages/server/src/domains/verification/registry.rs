//! Shared PIN registry with single-use consumption.
//!
//! Two independent callers touch each registry: the provider's inbound
//! callback (marks verified) and the orchestrator (checks, then consumes).
//! `check_verified` is idempotent and safe to poll; `consume` removes the
//! entry so a duplicate consumption observes `None`.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;

use super::models::{Provider, VerifiedIdentity};

const PIN_LENGTH: usize = 6;
const PIN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone)]
struct PendingVerification {
    identity: Option<VerifiedIdentity>,
    verified: bool,
}

pub struct PinRegistry {
    provider: Provider,
    entries: Mutex<HashMap<String, PendingVerification>>,
    /// Per-chat language preference, keyed independently of PINs. Only the
    /// Telegram bot populates this.
    languages: Mutex<HashMap<String, String>>,
}

impl PinRegistry {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            entries: Mutex::new(HashMap::new()),
            languages: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Issue a fresh PIN. A provider that already knows who it is talking to
    /// (e.g. Matrix, where the admin addresses a user id) binds the identity
    /// up front; it still counts as unverified until the callback fires.
    pub fn issue_pin(&self, context: Option<VerifiedIdentity>) -> String {
        let mut entries = self.entries.lock().unwrap();
        loop {
            let pin = generate_pin();
            if entries.contains_key(&pin) {
                continue;
            }
            entries.insert(
                pin.clone(),
                PendingVerification {
                    identity: context,
                    verified: false,
                },
            );
            return pin;
        }
    }

    /// Called by the provider's inbound callback once out-of-band proof
    /// succeeds. Returns false for an unknown PIN.
    pub fn mark_verified(&self, pin: &str, identity: VerifiedIdentity) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(pin) {
            Some(entry) => {
                entry.identity = Some(identity);
                entry.verified = true;
                true
            }
            None => false,
        }
    }

    /// Idempotent read: the verified identity behind a PIN, if any.
    pub fn check_verified(&self, pin: &str) -> Option<VerifiedIdentity> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(pin)
            .filter(|e| e.verified)
            .and_then(|e| e.identity.clone())
    }

    /// Remove the entry, returning the identity iff it was verified.
    /// At-most-once: a second consumption of the same PIN yields `None`.
    pub fn consume(&self, pin: &str) -> Option<VerifiedIdentity> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.remove(pin)?;
        if entry.verified {
            entry.identity
        } else {
            None
        }
    }

    pub fn set_language(&self, chat_id: &str, lang: &str) {
        self.languages
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), lang.to_string());
    }

    pub fn language(&self, chat_id: &str) -> Option<String> {
        self.languages.lock().unwrap().get(chat_id).cloned()
    }
}

fn generate_pin() -> String {
    let mut rng = rand::rng();
    (0..PIN_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..PIN_CHARSET.len());
            PIN_CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            provider: Provider::Telegram,
            user_id: "12345".to_string(),
            username: "alice".to_string(),
            channel_id: "12345".to_string(),
        }
    }

    #[test]
    fn test_pin_shape() {
        let registry = PinRegistry::new(Provider::Telegram);
        let pin = registry.issue_pin(None);
        assert_eq!(pin.len(), PIN_LENGTH);
        assert!(pin.bytes().all(|b| PIN_CHARSET.contains(&b)));
    }

    #[test]
    fn test_unverified_pin_yields_nothing() {
        let registry = PinRegistry::new(Provider::Telegram);
        let pin = registry.issue_pin(None);
        assert!(registry.check_verified(&pin).is_none());
        assert!(registry.consume(&pin).is_none());
    }

    #[test]
    fn test_check_is_idempotent_and_consume_is_single_use() {
        let registry = PinRegistry::new(Provider::Telegram);
        let pin = registry.issue_pin(None);
        assert!(registry.mark_verified(&pin, identity()));

        assert_eq!(registry.check_verified(&pin), Some(identity()));
        assert_eq!(registry.check_verified(&pin), Some(identity()));

        assert_eq!(registry.consume(&pin), Some(identity()));
        assert_eq!(registry.consume(&pin), None);
        assert!(registry.check_verified(&pin).is_none());
    }

    #[test]
    fn test_mark_verified_unknown_pin() {
        let registry = PinRegistry::new(Provider::Discord);
        assert!(!registry.mark_verified("NOPE", identity()));
    }

    #[test]
    fn test_language_map_is_independent_of_pins() {
        let registry = PinRegistry::new(Provider::Telegram);
        registry.set_language("12345", "de");
        let pin = registry.issue_pin(None);
        registry.mark_verified(&pin, identity());
        registry.consume(&pin);
        assert_eq!(registry.language("12345"), Some("de".to_string()));
    }
}
