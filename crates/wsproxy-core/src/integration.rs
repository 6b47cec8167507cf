//! Persisted link between a tenant company and one wholesaler account.
//!
//! The credential state is a tagged union so a record can never claim to be
//! active while still waiting for an SMS code. `is_active` is derived from
//! the tag and never stored independently.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jar::CookieJar;

/// Opaque tenant fields carried verbatim from the login request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationContext {
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub wholesaler_id: String,
    #[serde(default)]
    pub wholesaler_name: String,
    #[serde(default)]
    pub branza: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    pub username: String,
    pub password: String,
    pub cookie_jar: CookieJar,
    pub last_refresh: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl SessionCredentials {
    /// True while the session was refreshed less than `window` ago.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_refresh < window
    }

    #[must_use]
    pub fn has_login(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("cookie_jar", &self.cookie_jar)
            .field("last_refresh", &self.last_refresh)
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// A login parked between the password step and the SMS code step.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChallenge {
    pub temp_id: String,
    pub cookie_jar: CookieJar,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl PendingChallenge {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

impl fmt::Debug for PendingChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingChallenge")
            .field("temp_id", &self.temp_id)
            .field("cookie_jar", &self.cookie_jar)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    Authenticated(SessionCredentials),
    #[serde(rename = "pending_2fa")]
    Pending2fa(PendingChallenge),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: Uuid,
    #[serde(flatten)]
    pub context: IntegrationContext,
    pub credentials: Credentials,
    pub created_at: DateTime<Utc>,
}

impl Integration {
    #[must_use]
    pub fn new(context: IntegrationContext, credentials: Credentials) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
            credentials,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.credentials, Credentials::Authenticated(_))
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionCredentials> {
        match &self.credentials {
            Credentials::Authenticated(session) => Some(session),
            Credentials::Pending2fa(_) => None,
        }
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingChallenge> {
        match &self.credentials {
            Credentials::Pending2fa(pending) => Some(pending),
            Credentials::Authenticated(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(created_at: DateTime<Utc>) -> PendingChallenge {
        PendingChallenge {
            temp_id: "0a1b2c".to_string(),
            cookie_jar: CookieJar::new(),
            username: "jan".to_string(),
            password: "tajne".to_string(),
            created_at,
        }
    }

    #[test]
    fn credentials_serialize_with_kind_tag() {
        let created = Utc::now();
        let json = serde_json::to_value(Credentials::Pending2fa(pending(created))).unwrap();
        assert_eq!(json["kind"], "pending_2fa");
        assert_eq!(json["tempId"], "0a1b2c");

        let back: Credentials = serde_json::from_value(json).unwrap();
        assert!(matches!(back, Credentials::Pending2fa(ref p) if p.temp_id == "0a1b2c"));
    }

    #[test]
    fn is_active_follows_credential_tag() {
        let waiting = Integration::new(
            IntegrationContext::default(),
            Credentials::Pending2fa(pending(Utc::now())),
        );
        assert!(!waiting.is_active());
        assert!(waiting.pending().is_some());
        assert!(waiting.session().is_none());

        let active = Integration::new(
            IntegrationContext::default(),
            Credentials::Authenticated(SessionCredentials {
                username: "jan".to_string(),
                password: "tajne".to_string(),
                cookie_jar: CookieJar::new(),
                last_refresh: Utc::now(),
                client_id: None,
            }),
        );
        assert!(active.is_active());
    }

    #[test]
    fn pending_expires_after_ttl() {
        let now = Utc::now();
        let ttl = Duration::minutes(10);
        assert!(!pending(now - Duration::minutes(9)).is_expired(now, ttl));
        assert!(pending(now - Duration::minutes(11)).is_expired(now, ttl));
    }

    #[test]
    fn session_freshness_window() {
        let now = Utc::now();
        let session = SessionCredentials {
            username: "jan".to_string(),
            password: String::new(),
            cookie_jar: CookieJar::new(),
            last_refresh: now - Duration::minutes(29),
            client_id: None,
        };
        assert!(session.is_fresh(now, Duration::minutes(30)));
        assert!(!session.is_fresh(now + Duration::minutes(2), Duration::minutes(30)));
        assert!(!session.has_login());
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", pending(Utc::now()));
        assert!(!rendered.contains("tajne"));
    }
}
