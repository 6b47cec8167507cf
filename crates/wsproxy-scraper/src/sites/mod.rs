//! Per-site adapters and the registry the server dispatches on.

pub mod atut;
pub mod onninen;
pub mod ramirent;

use serde_json::Value;
use wsproxy_core::{AppConfig, CookieJar, Site};

use crate::auth::{AccountInfo, SignInOutcome, SiteAuth};
use crate::client::SiteClient;
use crate::error::ScraperError;

pub use atut::AtutSite;
pub use onninen::OnninenSite;
pub use ramirent::RamirentSite;

/// One configured client per upstream site.
#[derive(Debug, Clone)]
pub struct Sites {
    pub atut: AtutSite,
    pub ramirent: RamirentSite,
    pub onninen: OnninenSite,
}

impl Sites {
    /// Builds every site client from the configured origins, timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if a base URL is malformed or a client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let client = |base: &str, profile| {
            SiteClient::new(
                base,
                profile,
                config.scraper_request_timeout_secs,
                &config.scraper_user_agent,
            )
        };
        Ok(Self {
            atut: AtutSite::new(client(&config.atut_base_url, atut::HEADER_PROFILE)?),
            ramirent: RamirentSite::new(client(
                &config.ramirent_base_url,
                ramirent::HEADER_PROFILE,
            )?),
            onninen: OnninenSite::new(client(&config.onninen_base_url, onninen::HEADER_PROFILE)?),
        })
    }

    /// Login handshake of `site`, `None` for anonymous-only sites.
    #[must_use]
    pub fn authenticator(&self, site: Site) -> Option<Authenticator<'_>> {
        match site {
            Site::Atut => None,
            Site::Ramirent => Some(Authenticator::Ramirent(&self.ramirent)),
            Site::Onninen => Some(Authenticator::Onninen(&self.onninen)),
        }
    }
}

/// A site that supports login, chosen at runtime.
#[derive(Debug, Clone, Copy)]
pub enum Authenticator<'a> {
    Ramirent(&'a RamirentSite),
    Onninen(&'a OnninenSite),
}

impl SiteAuth for Authenticator<'_> {
    async fn sign_in(
        &self,
        jar: &mut CookieJar,
        username: &str,
        password: &str,
    ) -> Result<SignInOutcome, ScraperError> {
        match self {
            Self::Ramirent(site) => site.sign_in(jar, username, password).await,
            Self::Onninen(site) => site.sign_in(jar, username, password).await,
        }
    }

    async fn submit_code(
        &self,
        jar: &mut CookieJar,
        code: &str,
    ) -> Result<SignInOutcome, ScraperError> {
        match self {
            Self::Ramirent(site) => site.submit_code(jar, code).await,
            Self::Onninen(site) => site.submit_code(jar, code).await,
        }
    }

    async fn resend_code(&self, jar: &mut CookieJar) -> Result<String, ScraperError> {
        match self {
            Self::Ramirent(site) => site.resend_code(jar).await,
            Self::Onninen(site) => site.resend_code(jar).await,
        }
    }

    async fn probe(&self, jar: &mut CookieJar) -> Result<Option<AccountInfo>, ScraperError> {
        match self {
            Self::Ramirent(site) => site.probe(jar).await,
            Self::Onninen(site) => site.probe(jar).await,
        }
    }
}

/// Non-empty string form of a JSON string, number or bool.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Amount from a JSON number or a numeric string (decimal comma accepted).
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalars_become_strings() {
        assert_eq!(scalar_string(&json!(42)), Some("42".to_string()));
        assert_eq!(scalar_string(&json!(" abc ")), Some("abc".to_string()));
        assert_eq!(scalar_string(&json!("")), None);
        assert_eq!(scalar_string(&json!({"a": 1})), None);
        assert_eq!(scalar_string(&Value::Null), None);
    }

    #[test]
    fn numbers_accept_strings_and_commas() {
        assert_eq!(number(&json!(4.5)), Some(4.5));
        assert_eq!(number(&json!("4,50")), Some(4.5));
        assert_eq!(number(&json!("brak")), None);
        assert_eq!(number(&Value::Null), None);
    }
}
