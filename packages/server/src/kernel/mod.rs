//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod file_store;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use file_store::JsonFileStore;
pub use scheduled_tasks::start_scheduler;
pub use traits::*;
