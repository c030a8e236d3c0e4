//! Message constructors for the notification paths.
//!
//! Plain-text bodies; templating and localization live outside this core.

use chrono::{DateTime, Utc};

use crate::common::Message;
use crate::domains::invites::Invite;

pub fn expiry_notice(code: &str, invite: &Invite) -> Message {
    let label = if invite.label.is_empty() {
        code.to_string()
    } else {
        format!("{} ({})", invite.label, code)
    };
    Message::new(
        "Invite expired",
        format!(
            "Invite {} expired at {} and has been removed.",
            label,
            invite.valid_till.to_rfc3339()
        ),
    )
}

pub fn creation_notice(code: &str, username: &str, email: &str) -> Message {
    let who = if email.is_empty() {
        username.to_string()
    } else {
        format!("{} <{}>", username, email)
    };
    Message::new(
        "Account created",
        format!("Invite {} was used to create account {}.", code, who),
    )
}

pub fn confirmation_link(username: &str, external_url: &str, code: &str, token: &str) -> Message {
    Message::new(
        "Confirm your email",
        format!(
            "Hi {}, confirm your address to finish creating your account: \
             {}/invite/{}/confirm/{}",
            username, external_url, code, token
        ),
    )
}

pub fn welcome(username: &str, expiry: Option<DateTime<Utc>>) -> Message {
    let body = match expiry {
        Some(expiry) => format!(
            "Welcome, {}! Your account is ready and valid until {}.",
            username,
            expiry.to_rfc3339()
        ),
        None => format!("Welcome, {}! Your account is ready.", username),
    };
    Message::new("Welcome", body)
}

pub fn invite_message(code: &str, external_url: &str, valid_till: DateTime<Utc>) -> Message {
    Message::new(
        "You've been invited",
        format!(
            "You've been invited to join. Create your account at \
             {}/invite/{} before {}.",
            external_url,
            code,
            valid_till.to_rfc3339()
        ),
    )
}
