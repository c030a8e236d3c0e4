// Common types and utilities shared across the application

pub mod app_state;
pub mod time;
pub mod types;

pub use app_state::ServerState;
pub use time::add_offset;
pub use types::*;
