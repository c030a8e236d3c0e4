// Common types used across multiple domains and layers

use serde::{Deserialize, Serialize};

/// A rendered message ready for delivery over any transport.
///
/// Chat transports typically ignore the subject line; mail uses both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Returns true when an address looks like an email address rather than a
/// linked-account identifier. Notification routing branches on this.
pub fn is_email_address(addr: &str) -> bool {
    addr.contains('@')
}
