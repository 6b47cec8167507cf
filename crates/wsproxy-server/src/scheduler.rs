//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring purge of expired SMS challenges.

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use wsproxy_db::{AnyStore, SessionStore};
use wsproxy_session::SessionPolicy;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    store: AnyStore,
    policy: SessionPolicy,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_pending_purge_job(&scheduler, store, policy).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the pending-challenge purge, every minute at second 0 (`0 * * * * *`).
async fn register_pending_purge_job(
    scheduler: &JobScheduler,
    store: AnyStore,
    policy: SessionPolicy,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let store = store.clone();
        Box::pin(async move {
            purge_expired(&store, &policy).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Deletes SMS challenges older than the pending lifetime. Returns how many went.
pub async fn purge_expired<S: SessionStore>(store: &S, policy: &SessionPolicy) -> u64 {
    let cutoff = Utc::now()
        .checked_sub_signed(policy.pending_ttl)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    match store.purge_expired_pending(cutoff).await {
        Ok(0) => 0,
        Ok(purged) => {
            tracing::info!(purged, "scheduler: purged expired SMS challenges");
            purged
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to purge expired SMS challenges");
            0
        }
    }
}
