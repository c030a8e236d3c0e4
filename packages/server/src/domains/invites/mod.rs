//! Invite lifecycle: creation, consumption, expiry housekeeping.

pub mod actions;
pub mod models;
pub mod store;
pub mod sweeper;

pub use actions::{generate_invite, GenerateInviteRequest};
pub use models::{Invite, InviteUsage, NotifyPrefs, UserExpiryOffset};
pub use store::{InviteError, InviteStore};
pub use sweeper::sweep_expired_invites;
