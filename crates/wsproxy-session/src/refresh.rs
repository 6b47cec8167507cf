//! Picks the cookie jar a catalog request runs with.
//!
//! A stored session younger than the fresh window is reused as is. An older
//! one is probed, and a dead one is silently re-logged with the stored
//! credentials. Every failure degrades to anonymous browsing.

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsproxy_core::{AppConfig, CookieJar, Credentials, Integration, SessionCredentials};
use wsproxy_db::SessionStore;
use wsproxy_scraper::{AccountInfo, SignInOutcome, SiteAuth};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Sessions refreshed within this window are used without probing.
    pub fresh_window: Duration,
    /// Lifetime of a parked SMS challenge.
    pub pending_ttl: Duration,
}

impl SessionPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fresh_window: config.session_fresh_window(),
            pending_ttl: config.pending_ttl(),
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            fresh_window: Duration::minutes(30),
            pending_ttl: Duration::minutes(10),
        }
    }
}

/// Whose prices a response shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    /// The customer's own session.
    Personal,
    /// Anonymous browsing.
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub jar: CookieJar,
    pub source: SessionSource,
}

impl ResolvedSession {
    #[must_use]
    pub fn public() -> Self {
        Self {
            jar: CookieJar::new(),
            source: SessionSource::Public,
        }
    }

    fn personal(jar: CookieJar) -> Self {
        Self {
            jar,
            source: SessionSource::Personal,
        }
    }
}

/// Live login state of an integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Returns the jar to browse with for `integration_id`.
///
/// Never fails: a missing record, a pending challenge, a store error or a
/// failed re-login all give anonymous browsing.
pub async fn resolve_session<A, S>(
    auth: &A,
    store: &S,
    integration_id: Option<Uuid>,
    policy: &SessionPolicy,
) -> ResolvedSession
where
    A: SiteAuth,
    S: SessionStore,
{
    let Some(integration) = load(store, integration_id).await else {
        return ResolvedSession::public();
    };
    let Some(session) = integration.session() else {
        debug!(
            integration_id = %integration.id,
            "integration not authenticated, browsing anonymously"
        );
        return ResolvedSession::public();
    };

    if !session.cookie_jar.is_empty() && session.is_fresh(Utc::now(), policy.fresh_window) {
        return ResolvedSession::personal(session.cookie_jar.clone());
    }

    match revive(auth, store, &integration, session).await {
        Some((jar, _)) => ResolvedSession::personal(jar),
        None => ResolvedSession::public(),
    }
}

/// Checks the stored session against the site right now.
///
/// A dead session is re-logged like [`resolve_session`] would. Any failure
/// reports `authenticated: false`.
pub async fn session_status<A, S>(auth: &A, store: &S, integration_id: Uuid) -> SessionStatus
where
    A: SiteAuth,
    S: SessionStore,
{
    let Some(integration) = load(store, Some(integration_id)).await else {
        return SessionStatus::default();
    };
    let Some(session) = integration.session() else {
        return SessionStatus::default();
    };

    match revive(auth, store, &integration, session).await {
        Some((_, account)) => SessionStatus {
            authenticated: true,
            client_id: account.client_id.or_else(|| session.client_id.clone()),
            email: account.email,
        },
        None => SessionStatus::default(),
    }
}

async fn load<S: SessionStore>(store: &S, integration_id: Option<Uuid>) -> Option<Integration> {
    let id = integration_id?;
    match store.get(id).await {
        Ok(Some(integration)) => Some(integration),
        Ok(None) => {
            debug!(integration_id = %id, "integration not found, browsing anonymously");
            None
        }
        Err(error) => {
            warn!(integration_id = %id, error = %error, "failed to load integration");
            None
        }
    }
}

/// Probes the stored jar, then signs in again from an empty jar if it is dead.
async fn revive<A, S>(
    auth: &A,
    store: &S,
    integration: &Integration,
    session: &SessionCredentials,
) -> Option<(CookieJar, AccountInfo)>
where
    A: SiteAuth,
    S: SessionStore,
{
    let mut jar = session.cookie_jar.clone();
    match auth.probe(&mut jar).await {
        Ok(Some(account)) => {
            persist(store, integration, session, jar.clone(), &account).await;
            return Some((jar, account));
        }
        Ok(None) => debug!(integration_id = %integration.id, "stored session is dead"),
        Err(error) => {
            warn!(integration_id = %integration.id, error = %error, "session probe failed");
        }
    }

    if !session.has_login() {
        return None;
    }

    let mut jar = CookieJar::new();
    match auth.sign_in(&mut jar, &session.username, &session.password).await {
        Ok(SignInOutcome::Authenticated(account)) => {
            info!(integration_id = %integration.id, "session re-established");
            persist(store, integration, session, jar.clone(), &account).await;
            Some((jar, account))
        }
        Ok(SignInOutcome::NeedsCode { .. }) => {
            info!(
                integration_id = %integration.id,
                "re-login needs an SMS code, browsing anonymously"
            );
            None
        }
        Ok(SignInOutcome::Rejected { message }) => {
            warn!(integration_id = %integration.id, message = %message, "re-login rejected");
            None
        }
        Err(error) => {
            warn!(integration_id = %integration.id, error = %error, "re-login failed");
            None
        }
    }
}

async fn persist<S: SessionStore>(
    store: &S,
    integration: &Integration,
    session: &SessionCredentials,
    jar: CookieJar,
    account: &AccountInfo,
) {
    let mut updated = integration.clone();
    updated.credentials = Credentials::Authenticated(SessionCredentials {
        cookie_jar: jar,
        last_refresh: Utc::now(),
        client_id: account.client_id.clone().or_else(|| session.client_id.clone()),
        ..session.clone()
    });
    if let Err(error) = store.upsert(&updated).await {
        warn!(integration_id = %integration.id, error = %error, "failed to save refreshed session");
    }
}
