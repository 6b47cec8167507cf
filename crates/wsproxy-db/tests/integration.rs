//! Offline tests for wsproxy-db pool configuration, row mapping and the
//! in-memory session store. None of these need a live database.

use chrono::{Duration, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use wsproxy_core::{
    AppConfig, CookieJar, Credentials, Environment, Integration, IntegrationContext,
    PendingChallenge, SessionCredentials,
};
use wsproxy_db::{IntegrationRow, MemorySessionStore, PoolConfig, SessionStore};

fn context() -> IntegrationContext {
    IntegrationContext {
        company_id: "company-1".to_string(),
        wholesaler_id: "onninen".to_string(),
        wholesaler_name: "Onninen".to_string(),
        branza: "elektryka".to_string(),
    }
}

fn pending(temp_id: &str, age: Duration) -> Credentials {
    Credentials::Pending2fa(PendingChallenge {
        temp_id: temp_id.to_string(),
        cookie_jar: CookieJar::new(),
        username: "jan".to_string(),
        password: "tajne".to_string(),
        created_at: Utc::now() - age,
    })
}

fn authenticated() -> Credentials {
    Credentials::Authenticated(SessionCredentials {
        username: "jan".to_string(),
        password: "tajne".to_string(),
        cookie_jar: CookieJar::from_header_value("sid=1"),
        last_refresh: Utc::now(),
        client_id: Some("42".to_string()),
    })
}

fn app_config(database_url: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: database_url.map(str::to_string),
        env: Environment::Test,
        bind_addr: "127.0.0.1:3000".parse().unwrap(),
        log_level: "info".to_string(),
        api_keys: vec!["k".to_string()],
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        scraper_request_timeout_secs: 25,
        scraper_user_agent: "ua".to_string(),
        session_fresh_secs: 1800,
        pending_ttl_secs: 600,
        atut_base_url: "https://www.atutrental.com.pl".to_string(),
        ramirent_base_url: "https://ramirent.pl".to_string(),
        onninen_base_url: "https://onninen.pl".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config(Some("postgres://example")));
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn open_store_requires_a_database_url() {
    let err = wsproxy_db::open_store(&app_config(None)).await.unwrap_err();
    assert!(matches!(err, wsproxy_db::DbError::MissingDatabaseUrl));
}

#[test]
fn row_converts_into_integration() {
    let id = Uuid::new_v4();
    let row = IntegrationRow {
        id,
        company_id: "company-1".to_string(),
        wholesaler_id: "ramirent".to_string(),
        wholesaler_name: "Ramirent".to_string(),
        branza: "budowlana".to_string(),
        credentials: Json(authenticated()),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let integration = Integration::from(row);
    assert_eq!(integration.id, id);
    assert_eq!(integration.context.wholesaler_name, "Ramirent");
    assert!(integration.is_active());
    assert_eq!(
        integration.session().and_then(|s| s.client_id.as_deref()),
        Some("42")
    );
}

#[tokio::test]
async fn memory_store_finds_pending_by_temp_id_only() {
    let store = MemorySessionStore::new();
    let waiting = Integration::new(context(), pending("abc", Duration::zero()));
    let active = Integration::new(context(), authenticated());
    store.upsert(&waiting).await.unwrap();
    store.upsert(&active).await.unwrap();

    let found = store.find_pending("abc").await.unwrap().expect("pending");
    assert_eq!(found.id, waiting.id);
    assert!(store.find_pending("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn memory_store_upsert_replaces_credentials_but_keeps_context() {
    let store = MemorySessionStore::new();
    let mut record = Integration::new(context(), pending("abc", Duration::zero()));
    store.upsert(&record).await.unwrap();

    record.context.company_id = "someone-else".to_string();
    record.credentials = authenticated();
    store.upsert(&record).await.unwrap();

    let stored = store.get(record.id).await.unwrap().expect("record");
    assert!(stored.is_active());
    assert_eq!(stored.context.company_id, "company-1");
    assert!(store.find_pending("abc").await.unwrap().is_none());
}

#[tokio::test]
async fn memory_store_purges_only_expired_pending() {
    let store = MemorySessionStore::new();
    let stale = Integration::new(context(), pending("old", Duration::minutes(15)));
    let fresh = Integration::new(context(), pending("new", Duration::minutes(1)));
    let active = Integration::new(context(), authenticated());
    for record in [&stale, &fresh, &active] {
        store.upsert(record).await.unwrap();
    }

    let purged = store
        .purge_expired_pending(Utc::now() - Duration::minutes(10))
        .await
        .unwrap();

    assert_eq!(purged, 1);
    assert!(store.get(stale.id).await.unwrap().is_none());
    assert!(store.get(fresh.id).await.unwrap().is_some());
    assert!(store.get(active.id).await.unwrap().is_some());
}

#[tokio::test]
async fn memory_store_delete_reports_presence() {
    let store = MemorySessionStore::new();
    let record = Integration::new(context(), authenticated());
    store.upsert(&record).await.unwrap();

    assert!(store.delete(record.id).await.unwrap());
    assert!(!store.delete(record.id).await.unwrap());
    assert!(store.is_empty().await);
}
