//! Saved announcement templates and explicit announcements.
//!
//! Unlike the fire-and-forget notification paths, announcements are
//! synchronous: the caller asked for delivery and gets the failure list back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::error;

use super::dispatcher::{DeliveryFailure, NotificationDispatcher};
use crate::common::Message;
use crate::kernel::BaseDurableStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnouncementTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
}

impl AnnouncementTemplate {
    pub fn to_message(&self) -> Message {
        Message::new(self.subject.clone(), self.body.clone())
    }
}

pub struct TemplateStore {
    templates: Mutex<HashMap<String, AnnouncementTemplate>>,
    durable: Arc<dyn BaseDurableStore>,
}

impl TemplateStore {
    pub async fn load(durable: Arc<dyn BaseDurableStore>) -> anyhow::Result<Self> {
        Ok(Self {
            templates: Mutex::new(durable.load_templates().await?),
            durable,
        })
    }

    #[cfg(test)]
    pub fn empty(durable: Arc<dyn BaseDurableStore>) -> Self {
        Self {
            templates: Mutex::new(HashMap::new()),
            durable,
        }
    }

    pub async fn save(&self, template: AnnouncementTemplate) {
        self.templates
            .lock()
            .unwrap()
            .insert(template.name.clone(), template);
        self.persist().await;
    }

    pub fn get(&self, name: &str) -> Option<AnnouncementTemplate> {
        self.templates.lock().unwrap().get(name).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn delete(&self, name: &str) -> bool {
        let removed = self.templates.lock().unwrap().remove(name).is_some();
        if removed {
            self.persist().await;
        }
        removed
    }

    async fn persist(&self) {
        let snapshot = self.templates.lock().unwrap().clone();
        if let Err(e) = self.durable.store_templates(&snapshot).await {
            error!("Failed to store announcement templates: {}", e);
        }
    }
}

/// Send an announcement to a set of accounts, reporting every delivery
/// failure to the caller.
pub async fn announce(
    dispatcher: &NotificationDispatcher,
    account_ids: &[String],
    message: &Message,
) -> Vec<DeliveryFailure> {
    dispatcher.fan_out(account_ids, message).await
}
