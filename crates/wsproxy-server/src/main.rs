mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wsproxy_db::{AnyStore, MemorySessionStore};
use wsproxy_scraper::Sites;
use wsproxy_session::SessionPolicy;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = wsproxy_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = if config.database_url.is_some() {
        let store = wsproxy_db::open_store(&config).await?;
        let applied = wsproxy_db::run_migrations(store.pool()).await?;
        tracing::info!(applied, "database migrations up to date");
        AnyStore::Postgres(store)
    } else {
        tracing::warn!("DATABASE_URL not set; sessions kept in memory and lost on restart");
        AnyStore::Memory(MemorySessionStore::new())
    };

    let policy = SessionPolicy::from_app_config(&config);
    let _scheduler = scheduler::build_scheduler(store.clone(), policy).await?;

    let auth = AuthState::from_keys(&config.api_keys, config.is_development())?;
    let app = build_app(AppState {
        sites: Arc::new(Sites::from_config(&config)?),
        store,
        policy,
        auth,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "wsproxy-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
