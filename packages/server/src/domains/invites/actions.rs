//! Administrator-facing invite operations.

use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use tracing::{debug, error, info};

use super::models::{Invite, NotifyPrefs, UserExpiryOffset};
use super::store::InviteError;
use super::sweeper::sweep_expired_invites;
use crate::common::{is_email_address, ServerState};
use crate::domains::notify::messages;

const CODE_LENGTH: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, Default)]
pub struct GenerateInviteRequest {
    pub label: String,
    /// Invite lifetime as an offset from now.
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub multiple_uses: bool,
    pub remaining_uses: u32,
    pub no_limit: bool,
    pub user_expiry: Option<UserExpiryOffset>,
    pub profile: String,
    /// Email address or Discord handle to deliver the invite to.
    pub send_to: String,
}

/// Generate an invite code. Codes never begin with a digit.
fn generate_code() -> String {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..CODE_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CODE_CHARSET.len());
                CODE_CHARSET[idx] as char
            })
            .collect();
        if !code.starts_with(|c: char| c.is_ascii_digit()) {
            return code;
        }
    }
}

/// Create a new invite, optionally delivering it to `send_to`. Returns the
/// generated code.
pub async fn generate_invite(state: &ServerState, req: GenerateInviteRequest) -> Result<String> {
    debug!("Generating new invite");
    let now = Utc::now();
    let valid_till = crate::common::add_offset(now, req.months, req.days, req.hours, req.minutes);

    let mut invite = Invite::single_use(now, valid_till);
    invite.label = req.label;
    if req.multiple_uses {
        if req.no_limit {
            invite.no_limit = true;
            invite.remaining_uses = 0;
        } else {
            invite.remaining_uses = req.remaining_uses;
        }
    }
    invite.user_expiry = req.user_expiry;
    if !req.profile.is_empty() {
        invite.profile = if state.profiles.contains(&req.profile) {
            req.profile
        } else {
            crate::domains::profiles::store::FALLBACK_PROFILE.to_string()
        };
    }

    // Reserve a unique code before attempting delivery so the message can
    // carry the final code.
    let code = loop {
        let candidate = generate_code();
        match state.invites.create(&candidate, invite.clone()).await {
            Ok(()) => break candidate,
            Err(InviteError::DuplicateCode(_)) => continue,
        }
    };

    if !req.send_to.is_empty() && state.settings.invite_messages {
        let send_to = deliver_invite(state, &code, &invite, &req.send_to).await;
        state.invites.set_send_to(&code, &send_to).await;
    }

    Ok(code)
}

/// Try to deliver the invite message, returning the diagnostic string to
/// record on the invite. Delivery failure never fails invite creation.
async fn deliver_invite(state: &ServerState, code: &str, invite: &Invite, send_to: &str) -> String {
    debug!("{}: Sending invite message", code);
    let message = messages::invite_message(code, &state.settings.external_url, invite.valid_till);

    if state.settings.discord.enabled && !is_email_address(send_to) {
        let users = match state.deps.discord.find_users(send_to).await {
            Ok(users) => users,
            Err(e) => {
                error!("{}: Failed to look up Discord user: {}", code, e);
                return format!("Failed: User not found: \"{}\"", send_to);
            }
        };
        match users.as_slice() {
            [] => format!("Failed: User not found: \"{}\"", send_to),
            [user] => {
                match state
                    .deps
                    .discord
                    .send_direct_message(&message, &user.channel_id)
                    .await
                {
                    Ok(()) => {
                        info!("{}: Sent invite message to \"{}\"", code, send_to);
                        send_to.to_string()
                    }
                    Err(e) => {
                        error!("{}: Failed to send invite message: {}", code, e);
                        format!("Failed to send to {}", send_to)
                    }
                }
            }
            _ => format!("Failed: Multiple users found: \"{}\"", send_to),
        }
    } else if state.settings.email_enabled {
        match state.deps.mailer.send(&message, send_to).await {
            Ok(()) => {
                info!("{}: Sent invite email to \"{}\"", code, send_to);
                send_to.to_string()
            }
            Err(e) => {
                error!("{}: Failed to send invite email: {}", code, e);
                format!("Failed to send to {}", send_to)
            }
        }
    } else {
        String::new()
    }
}

pub async fn delete_invite(state: &ServerState, code: &str) -> bool {
    state.invites.delete(code).await
}

/// All live invites. Runs an opportunistic expiry sweep first so callers
/// never see stale entries.
pub async fn list_invites(state: &ServerState) -> Vec<(String, Invite)> {
    sweep_expired_invites(state, Utc::now()).await;
    state.invites.list()
}

pub async fn set_notify(
    state: &ServerState,
    code: &str,
    address: &str,
    prefs: NotifyPrefs,
) -> bool {
    state.invites.set_notify(code, address, prefs).await
}
