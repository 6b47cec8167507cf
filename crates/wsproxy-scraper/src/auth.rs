//! Site login handshakes.

use std::future::Future;

use serde::Serialize;
use wsproxy_core::CookieJar;

use crate::error::ScraperError;

/// Who the upstream site says is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Upstream customer number.
    pub client_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Classified result of one login step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Authenticated(AccountInfo),
    /// The site sent a one-time code and waits for it.
    NeedsCode { message: String },
    Rejected { message: String },
}

/// Login handshake of one upstream site.
///
/// Every method threads `jar`: cookies set by the site during the handshake
/// land there and are what the caller persists.
pub trait SiteAuth: Send + Sync {
    /// Signs in with a username and password.
    fn sign_in(
        &self,
        jar: &mut CookieJar,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<SignInOutcome, ScraperError>> + Send;

    /// Submits the one-time code of a pending challenge.
    fn submit_code(
        &self,
        jar: &mut CookieJar,
        code: &str,
    ) -> impl Future<Output = Result<SignInOutcome, ScraperError>> + Send;

    /// Asks the site to send the code again. Returns the message to show.
    fn resend_code(
        &self,
        jar: &mut CookieJar,
    ) -> impl Future<Output = Result<String, ScraperError>> + Send;

    /// Checks whether `jar` still carries a live session.
    fn probe(
        &self,
        jar: &mut CookieJar,
    ) -> impl Future<Output = Result<Option<AccountInfo>, ScraperError>> + Send;
}
