// Business domains
pub mod confirmation;
pub mod identity;
pub mod invites;
pub mod notify;
pub mod profiles;
pub mod provisioning;
pub mod verification;
