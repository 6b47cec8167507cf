//! Maintenance commands that need `DATABASE_URL`.

use chrono::{DateTime, Utc};
use wsproxy_core::AppConfig;
use wsproxy_db::SessionStore;

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let store = wsproxy_db::open_store(config).await?;
    let applied = wsproxy_db::run_migrations(store.pool()).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

pub(crate) async fn run_purge_pending(config: &AppConfig) -> anyhow::Result<()> {
    let store = wsproxy_db::open_store(config).await?;
    let cutoff = Utc::now()
        .checked_sub_signed(config.pending_ttl())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let purged = store.purge_expired_pending(cutoff).await?;
    tracing::info!(purged, "expired SMS challenges purged");
    println!("purged {purged} expired pending login(s)");
    Ok(())
}
