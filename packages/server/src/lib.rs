// Anteroom - invite-gated provisioning core
//
// This crate drives self-provisioning of accounts on a managed media service:
// administrators issue time- and use-limited invite codes, third parties
// redeem them (optionally after proving an identity on Discord/Matrix/Telegram
// or confirming an emailed link), and the orchestrator turns a validated
// invite into a configured account with linked identities and notifications.
//
// Architecture follows domain-driven design: external collaborators live
// behind `kernel` traits, business logic in `domains/*`.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
