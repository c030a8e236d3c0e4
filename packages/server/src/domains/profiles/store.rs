use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::error;

use super::models::Profile;
use crate::kernel::BaseDurableStore;

/// Name of the profile an invite falls back to when the one it names is gone.
pub const FALLBACK_PROFILE: &str = "Default";

pub struct ProfileStore {
    profiles: Mutex<HashMap<String, Profile>>,
    durable: Arc<dyn BaseDurableStore>,
}

impl ProfileStore {
    pub async fn load(durable: Arc<dyn BaseDurableStore>) -> anyhow::Result<Self> {
        let profiles = durable.load_profiles().await?;
        Ok(Self {
            profiles: Mutex::new(profiles),
            durable,
        })
    }

    #[cfg(test)]
    pub fn empty(durable: Arc<dyn BaseDurableStore>) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            durable,
        }
    }

    pub async fn create(&self, name: &str, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(name.to_string(), profile);
        self.persist().await;
    }

    pub async fn delete(&self, name: &str) -> bool {
        let removed = self.profiles.lock().unwrap().remove(name).is_some();
        if removed {
            self.persist().await;
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.lock().unwrap().contains_key(name)
    }

    pub fn list(&self) -> Vec<(String, Profile)> {
        let mut all: Vec<(String, Profile)> = self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .map(|(n, p)| (n.clone(), p.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Mark one profile as the default, clearing the flag elsewhere.
    pub async fn set_default(&self, name: &str) -> bool {
        let updated = {
            let mut profiles = self.profiles.lock().unwrap();
            if !profiles.contains_key(name) {
                false
            } else {
                for (n, p) in profiles.iter_mut() {
                    p.default = n == name;
                }
                true
            }
        };
        if updated {
            self.persist().await;
        }
        updated
    }

    /// Resolve the profile an invite references, falling back to the
    /// fallback profile when the named one is missing.
    pub fn resolve(&self, name: &str) -> Option<Profile> {
        let profiles = self.profiles.lock().unwrap();
        profiles
            .get(name)
            .or_else(|| profiles.get(FALLBACK_PROFILE))
            .cloned()
    }

    async fn persist(&self) {
        let snapshot = self.profiles.lock().unwrap().clone();
        if let Err(e) = self.durable.store_profiles(&snapshot).await {
            error!("Failed to store profiles: {}", e);
        }
    }
}
