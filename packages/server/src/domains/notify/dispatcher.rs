//! Channel-resolving notification dispatch.
//!
//! Callers hand over an account id or an address; the dispatcher picks the
//! transport. Fan-out is concurrent with per-recipient failure isolation:
//! one recipient's failure never blocks or fails the others.

use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::common::{is_email_address, Message};
use crate::domains::identity::IdentityStore;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("delivery to {recipient} failed: {detail}")]
pub struct DeliveryFailure {
    pub recipient: String,
    pub detail: String,
}

pub struct NotificationDispatcher {
    deps: ServerDeps,
    identities: Arc<IdentityStore>,
}

impl NotificationDispatcher {
    pub fn new(deps: ServerDeps, identities: Arc<IdentityStore>) -> Self {
        Self { deps, identities }
    }

    /// Send to an account over its preferred channel: the contact email
    /// address when one is on file, otherwise the first linked chat identity
    /// (Discord, then Telegram, then Matrix).
    pub async fn send_to_account(
        &self,
        account_id: &str,
        message: &Message,
    ) -> Result<(), DeliveryFailure> {
        let fail = |detail: String| DeliveryFailure {
            recipient: account_id.to_string(),
            detail,
        };

        if let Some(email) = self.identities.email_for(account_id) {
            if email.contact {
                return self
                    .deps
                    .mailer
                    .send(message, &email.address)
                    .await
                    .map_err(|e| fail(e.to_string()));
            }
        }
        if let Some(discord) = self.identities.discord_for(account_id) {
            if discord.contact {
                return self
                    .deps
                    .discord
                    .send_direct_message(message, &discord.channel_id)
                    .await
                    .map_err(|e| fail(e.to_string()));
            }
        }
        if let Some(telegram) = self.identities.telegram_for(account_id) {
            if telegram.contact {
                return self
                    .deps
                    .telegram
                    .send_direct_message(message, &telegram.chat_id)
                    .await
                    .map_err(|e| fail(e.to_string()));
            }
        }
        if let Some(matrix) = self.identities.matrix_for(account_id) {
            if matrix.contact {
                return self
                    .deps
                    .matrix
                    .send_direct_message(message, &matrix.room_id)
                    .await
                    .map_err(|e| fail(e.to_string()));
            }
        }
        Err(fail("no contact method configured".to_string()))
    }

    /// Route on the address shape: an email address goes through the mailer,
    /// anything else is treated as an account id.
    pub async fn send_to_address(
        &self,
        address: &str,
        message: &Message,
    ) -> Result<(), DeliveryFailure> {
        if is_email_address(address) {
            self.deps
                .mailer
                .send(message, address)
                .await
                .map_err(|e| DeliveryFailure {
                    recipient: address.to_string(),
                    detail: e.to_string(),
                })
        } else {
            self.send_to_account(address, message).await
        }
    }

    /// Deliver concurrently to a list of addresses, collecting per-recipient
    /// failures.
    pub async fn fan_out(&self, addresses: &[String], message: &Message) -> Vec<DeliveryFailure> {
        let sends = addresses
            .iter()
            .map(|addr| self.send_to_address(addr, message));
        join_all(sends)
            .await
            .into_iter()
            .filter_map(|r| r.err())
            .collect()
    }

    /// Welcome delivery: every contact channel the account has configured,
    /// concurrently, best effort per channel.
    pub async fn broadcast_to_account(
        &self,
        account_id: &str,
        message: &Message,
    ) -> Vec<DeliveryFailure> {
        let fail = |channel: &str, detail: String| DeliveryFailure {
            recipient: format!("{}:{}", channel, account_id),
            detail,
        };

        let email = self.identities.email_for(account_id);
        let discord = self.identities.discord_for(account_id);
        let telegram = self.identities.telegram_for(account_id);
        let matrix = self.identities.matrix_for(account_id);

        let email_send = async {
            match email {
                Some(email) if email.contact => self
                    .deps
                    .mailer
                    .send(message, &email.address)
                    .await
                    .map_err(|e| fail("email", e.to_string())),
                _ => Ok(()),
            }
        };
        let discord_send = async {
            match discord {
                Some(discord) if discord.contact => self
                    .deps
                    .discord
                    .send_direct_message(message, &discord.channel_id)
                    .await
                    .map_err(|e| fail("discord", e.to_string())),
                _ => Ok(()),
            }
        };
        let telegram_send = async {
            match telegram {
                Some(telegram) if telegram.contact => self
                    .deps
                    .telegram
                    .send_direct_message(message, &telegram.chat_id)
                    .await
                    .map_err(|e| fail("telegram", e.to_string())),
                _ => Ok(()),
            }
        };
        let matrix_send = async {
            match matrix {
                Some(matrix) if matrix.contact => self
                    .deps
                    .matrix
                    .send_direct_message(message, &matrix.room_id)
                    .await
                    .map_err(|e| fail("matrix", e.to_string())),
                _ => Ok(()),
            }
        };

        let (e, d, t, m) = futures::join!(email_send, discord_send, telegram_send, matrix_send);
        let failures: Vec<DeliveryFailure> =
            [e, d, t, m].into_iter().filter_map(|r| r.err()).collect();
        if failures.is_empty() {
            info!("Sent message to account {}", account_id);
        } else {
            for failure in &failures {
                warn!("{}", failure);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::identity::{DiscordIdentity, EmailContact};
    use crate::kernel::test_dependencies::{MockMailer, TestDependencies};

    fn message() -> Message {
        Message::new("subj", "body")
    }

    async fn dispatcher_with(mocks: &TestDependencies) -> (NotificationDispatcher, Arc<IdentityStore>) {
        let identities = Arc::new(IdentityStore::empty(mocks.store.clone()));
        (
            NotificationDispatcher::new(mocks.deps(), identities.clone()),
            identities,
        )
    }

    fn discord_identity(contact: bool) -> DiscordIdentity {
        DiscordIdentity {
            id: "d1".to_string(),
            username: "alice".to_string(),
            channel_id: "chan-1".to_string(),
            contact,
        }
    }

    #[tokio::test]
    async fn test_email_preferred_over_chat_channels() {
        let mocks = TestDependencies::new();
        let (dispatcher, identities) = dispatcher_with(&mocks).await;
        identities
            .set_email_contact(
                "acct",
                EmailContact {
                    address: "a@example.com".to_string(),
                    contact: true,
                },
            )
            .await;
        identities.link_discord("acct", discord_identity(true)).await;

        dispatcher.send_to_account("acct", &message()).await.unwrap();

        assert_eq!(mocks.mailer.sent().len(), 1);
        assert!(mocks.discord.dms().is_empty());
    }

    #[tokio::test]
    async fn test_non_contact_channel_is_skipped() {
        let mocks = TestDependencies::new();
        let (dispatcher, identities) = dispatcher_with(&mocks).await;
        identities
            .set_email_contact(
                "acct",
                EmailContact {
                    address: "a@example.com".to_string(),
                    contact: false,
                },
            )
            .await;
        identities.link_discord("acct", discord_identity(true)).await;

        dispatcher.send_to_account("acct", &message()).await.unwrap();

        assert!(mocks.mailer.sent().is_empty());
        assert_eq!(mocks.discord.dms().len(), 1);
    }

    #[tokio::test]
    async fn test_account_without_channels_fails() {
        let mocks = TestDependencies::new();
        let (dispatcher, _) = dispatcher_with(&mocks).await;
        let err = dispatcher
            .send_to_account("acct", &message())
            .await
            .unwrap_err();
        assert_eq!(err.recipient, "acct");
    }

    #[tokio::test]
    async fn test_address_routing_on_at_sign() {
        let mocks = TestDependencies::new();
        let (dispatcher, identities) = dispatcher_with(&mocks).await;
        identities.link_discord("acct", discord_identity(true)).await;

        dispatcher
            .send_to_address("admin@example.com", &message())
            .await
            .unwrap();
        dispatcher.send_to_address("acct", &message()).await.unwrap();

        assert_eq!(mocks.mailer.sent()[0].0, "admin@example.com");
        assert_eq!(mocks.discord.dms()[0].0, "chan-1");
    }

    #[tokio::test]
    async fn test_fan_out_collects_per_recipient_failures() {
        let mocks = TestDependencies::new().with_mailer(MockMailer::new().failing());
        let (dispatcher, identities) = dispatcher_with(&mocks).await;
        identities.link_discord("acct", discord_identity(true)).await;

        let failures = dispatcher
            .fan_out(
                &[
                    "a@example.com".to_string(),
                    "acct".to_string(),
                    "b@example.com".to_string(),
                ],
                &message(),
            )
            .await;

        // both mail sends fail, the chat send gets through
        assert_eq!(failures.len(), 2);
        assert_eq!(mocks.discord.dms().len(), 1);
    }
}
