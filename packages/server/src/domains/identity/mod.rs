//! Linked identities and account-expiry bookkeeping.

pub mod models;
pub mod store;

pub use models::{DiscordIdentity, EmailContact, MatrixIdentity, TelegramIdentity};
pub use store::{AccountExpiryStore, IdentityStore};
