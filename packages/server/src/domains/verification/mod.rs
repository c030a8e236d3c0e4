//! Multi-channel identity verification.
//!
//! Each chat provider owns a registry mapping short-lived PINs to
//! externally-proven identities. The orchestrator iterates the fixed ordered
//! list of provider gates rather than branching per provider.

pub mod models;
pub mod providers;
pub mod registry;

pub use models::{Provider, VerifiedIdentity};
pub use providers::{check_verified_for_invite, provider_gates, ProviderGate};
pub use registry::PinRegistry;
