//! Reusable account-settings templates.

pub mod applier;
pub mod models;
pub mod store;

pub use applier::{apply_profile, AspectOutcome, ProfileApplyReport};
pub use models::Profile;
pub use store::ProfileStore;
