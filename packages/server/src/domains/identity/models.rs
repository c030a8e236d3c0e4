use serde::{Deserialize, Serialize};

/// Email address on file for an account. `contact` controls whether the
/// dispatcher may use it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailContact {
    pub address: String,
    #[serde(default = "default_true")]
    pub contact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscordIdentity {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub contact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelegramIdentity {
    pub chat_id: String,
    pub username: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub contact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatrixIdentity {
    pub user_id: String,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub contact: bool,
}

fn default_true() -> bool {
    true
}
