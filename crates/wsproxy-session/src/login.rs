//! Password step, SMS code step and logout.

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use wsproxy_core::{
    CookieJar, Credentials, Integration, IntegrationContext, PendingChallenge, SessionCredentials,
};
use wsproxy_db::SessionStore;
use wsproxy_scraper::{AccountInfo, SignInOutcome, SiteAuth};

use crate::error::AuthError;
use crate::temp_id::new_temp_id;

/// Password login as it arrives from the API.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub context: IntegrationContext,
    /// Re-login into this record instead of creating a new one.
    pub existing_integration_id: Option<Uuid>,
}

/// What a login or code step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    Authenticated {
        integration_id: Uuid,
        username: String,
        client_id: Option<String>,
    },
    /// The site sent an SMS code; `temp_id` names the parked challenge.
    NeedsCode { temp_id: String, message: String },
}

/// Login state machine of one site, persisted through `store`.
pub struct LoginFlow<'a, A, S> {
    auth: &'a A,
    store: &'a S,
    pending_ttl: Duration,
}

impl<'a, A, S> LoginFlow<'a, A, S>
where
    A: SiteAuth,
    S: SessionStore,
{
    pub fn new(auth: &'a A, store: &'a S, pending_ttl: Duration) -> Self {
        Self {
            auth,
            store,
            pending_ttl,
        }
    }

    /// Signs in with a fresh cookie jar.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingField`] for a blank username or password,
    /// [`AuthError::Rejected`] when the site refuses the credentials, and
    /// store or upstream failures.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResult, AuthError> {
        if request.username.trim().is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if request.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let mut jar = CookieJar::new();
        let outcome = self
            .auth
            .sign_in(&mut jar, &request.username, &request.password)
            .await?;

        match outcome {
            SignInOutcome::Authenticated(account) => {
                let mut integration = self.target_record(&request).await?;
                let client_id = account.client_id.clone();
                integration.credentials =
                    active(request.username.clone(), request.password, jar, &account);
                let integration_id = self.store.upsert(&integration).await?;
                info!(integration_id = %integration_id, "integration authenticated");
                Ok(LoginResult::Authenticated {
                    integration_id,
                    username: request.username,
                    client_id,
                })
            }
            SignInOutcome::NeedsCode { message } => {
                let mut integration = self.target_record(&request).await?;
                let temp_id = new_temp_id();
                integration.credentials = Credentials::Pending2fa(PendingChallenge {
                    temp_id: temp_id.clone(),
                    cookie_jar: jar,
                    username: request.username,
                    password: request.password,
                    created_at: Utc::now(),
                });
                let integration_id = self.store.upsert(&integration).await?;
                info!(integration_id = %integration_id, "login waiting for SMS code");
                Ok(LoginResult::NeedsCode { temp_id, message })
            }
            SignInOutcome::Rejected { message } => Err(AuthError::Rejected(message)),
        }
    }

    /// Submits the SMS code of a parked challenge.
    ///
    /// A wrong code keeps the same `temp_id`; cookies the site set meanwhile
    /// are saved into the pending record.
    ///
    /// # Errors
    ///
    /// [`AuthError::Expired`] when the challenge is unknown or too old (an old
    /// record is deleted), [`AuthError::Rejected`] when the site denies access,
    /// and store or upstream failures.
    pub async fn verify(&self, temp_id: &str, code: &str) -> Result<LoginResult, AuthError> {
        if temp_id.is_empty() {
            return Err(AuthError::MissingField("tempId"));
        }
        if code.trim().is_empty() {
            return Err(AuthError::MissingField("code2fa"));
        }

        let (mut integration, pending) = self.live_pending(temp_id).await?;
        let mut jar = pending.cookie_jar.clone();

        match self.auth.submit_code(&mut jar, code.trim()).await? {
            SignInOutcome::Authenticated(account) => {
                let client_id = account.client_id.clone();
                let username = pending.username.clone();
                integration.credentials = active(pending.username, pending.password, jar, &account);
                let integration_id = self.store.upsert(&integration).await?;
                info!(integration_id = %integration_id, "SMS code accepted");
                Ok(LoginResult::Authenticated {
                    integration_id,
                    username,
                    client_id,
                })
            }
            SignInOutcome::NeedsCode { message } => {
                integration.credentials = Credentials::Pending2fa(PendingChallenge {
                    cookie_jar: jar,
                    ..pending
                });
                self.store.upsert(&integration).await?;
                Ok(LoginResult::NeedsCode {
                    temp_id: temp_id.to_owned(),
                    message,
                })
            }
            SignInOutcome::Rejected { message } => {
                warn!(integration_id = %integration.id, "SMS step rejected by site");
                Err(AuthError::Rejected(message))
            }
        }
    }

    /// Asks the site to send the SMS code again. Returns the message to show.
    ///
    /// # Errors
    ///
    /// [`AuthError::Expired`] when the challenge is unknown or too old, and
    /// store or upstream failures.
    pub async fn resend(&self, temp_id: &str) -> Result<String, AuthError> {
        if temp_id.is_empty() {
            return Err(AuthError::MissingField("tempId"));
        }

        let (mut integration, pending) = self.live_pending(temp_id).await?;
        let mut jar = pending.cookie_jar.clone();
        let message = self.auth.resend_code(&mut jar).await?;

        if jar != pending.cookie_jar {
            integration.credentials = Credentials::Pending2fa(PendingChallenge {
                cookie_jar: jar,
                ..pending
            });
            self.store.upsert(&integration).await?;
        }
        Ok(message)
    }

    /// Deletes the integration. Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the delete fails.
    pub async fn logout(&self, integration_id: Uuid) -> Result<bool, AuthError> {
        let deleted = self.store.delete(integration_id).await?;
        info!(integration_id = %integration_id, deleted, "integration logged out");
        Ok(deleted)
    }

    /// Record a login writes into: the existing one when asked for, else a new one.
    async fn target_record(&self, request: &LoginRequest) -> Result<Integration, AuthError> {
        let Some(id) = request.existing_integration_id else {
            return Ok(Integration::new(request.context.clone(), pending_placeholder()));
        };
        if let Some(existing) = self.store.get(id).await? {
            return Ok(existing);
        }
        let mut fresh = Integration::new(request.context.clone(), pending_placeholder());
        fresh.id = id;
        Ok(fresh)
    }

    async fn live_pending(
        &self,
        temp_id: &str,
    ) -> Result<(Integration, PendingChallenge), AuthError> {
        let Some(integration) = self.store.find_pending(temp_id).await? else {
            return Err(AuthError::Expired);
        };
        let Some(pending) = integration.pending().cloned() else {
            return Err(AuthError::Expired);
        };
        if pending.is_expired(Utc::now(), self.pending_ttl) {
            self.store.delete(integration.id).await?;
            info!(integration_id = %integration.id, "expired SMS challenge removed");
            return Err(AuthError::Expired);
        }
        Ok((integration, pending))
    }
}

fn active(
    username: String,
    password: String,
    jar: CookieJar,
    account: &AccountInfo,
) -> Credentials {
    Credentials::Authenticated(SessionCredentials {
        username,
        password,
        cookie_jar: jar,
        last_refresh: Utc::now(),
        client_id: account.client_id.clone(),
    })
}

/// Credentials of a record that is about to be overwritten before it is stored.
fn pending_placeholder() -> Credentials {
    Credentials::Pending2fa(PendingChallenge {
        temp_id: String::new(),
        cookie_jar: CookieJar::new(),
        username: String::new(),
        password: String::new(),
        created_at: Utc::now(),
    })
}
