//! The provisioning orchestrator and its request/outcome types.

pub mod errors;
pub mod orchestrator;
pub mod types;

pub use errors::ProvisionError;
pub use orchestrator::Provisioner;
pub use types::{ProvisionDiagnostics, ProvisionStatus, ProvisioningRequest};
