//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The only periodic task in this core is the invite housekeeping sweep;
//! it also runs opportunistically on invite-list reads, so the schedule is
//! a safety net for idle deployments.

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::common::ServerState;
use crate::domains::invites::sweep_expired_invites;

/// Start all scheduled tasks
pub async fn start_scheduler(state: ServerState, sweep_schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_state = state.clone();
    let sweep_job = Job::new_async(sweep_schedule, move |_uuid, _lock| {
        let state = sweep_state.clone();
        Box::pin(async move {
            let deleted = sweep_expired_invites(&state, Utc::now()).await;
            if deleted > 0 {
                tracing::info!("Housekeeping: removed {} expired invites", deleted);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (invite sweep: {})", sweep_schedule);
    Ok(scheduler)
}
