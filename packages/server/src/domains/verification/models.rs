use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat platforms on which identity can be proven out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Discord,
    Matrix,
    Telegram,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Discord => write!(f, "discord"),
            Provider::Matrix => write!(f, "matrix"),
            Provider::Telegram => write!(f, "telegram"),
        }
    }
}

/// An externally-authenticated identity on one platform.
///
/// `channel_id` is the direct-message channel: a DM channel id on Discord, a
/// room id on Matrix, a chat id on Telegram. It may be empty until the
/// provider action that opens the channel has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub provider: Provider,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub channel_id: String,
}
