//! Housekeeping: expired-invite sweep.
//!
//! Runs on a schedule and opportunistically on invite-list reads. The sweep
//! works from a single time snapshot: notify subscribed administrators per
//! expired invite (concurrently per invite), then delete sequentially in
//! deterministic order and persist once.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::common::ServerState;
use crate::domains::notify::messages;

/// Sweep expired invites, returning how many were deleted.
pub async fn sweep_expired_invites(state: &ServerState, now: DateTime<Utc>) -> usize {
    let expired = state.invites.expired(now);
    if expired.is_empty() {
        return 0;
    }

    let notifications_on = state.settings.email_enabled && state.settings.notifications_enabled;
    for (code, invite) in &expired {
        debug!("Housekeeping: deleting old invite {}", code);
        if !notifications_on {
            continue;
        }
        let subscribers = invite.expiry_subscribers();
        if subscribers.is_empty() {
            continue;
        }
        debug!("{}: Expiry notification", code);
        let message = messages::expiry_notice(code, invite);
        let sends = subscribers
            .iter()
            .map(|addr| state.dispatcher.send_to_address(addr, &message));
        for (addr, result) in subscribers.iter().zip(join_all(sends).await) {
            match result {
                Ok(()) => info!("Sent expiry notification to {}", addr),
                Err(e) => warn!("{}: Failed to send expiry notification: {}", code, e),
            }
        }
    }

    let codes: Vec<String> = expired.into_iter().map(|(code, _)| code).collect();
    state.invites.remove(&codes).await
}
