//! HTTP adapter shared by every site integration.
//!
//! Each request carries a browser-like header profile and the caller's
//! [`CookieJar`]. Every `Set-Cookie` on the response, redirects included on
//! the final hop, is merged back into that jar.

mod origin;

use std::time::Duration;

use reqwest::header::{
    HeaderMap, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE,
};
use reqwest::{redirect, Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use wsproxy_core::CookieJar;

use crate::error::ScraperError;

pub use origin::{absolutize, normalize_path, parse_base, path_depth, resolve, site_path};

pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,*/*";
pub const JSON_ACCEPT: &str = "application/json, text/plain, */*";
const ACCEPT_LANGUAGE_PL: &str = "pl-PL,pl;q=0.9";

/// Per-site header conventions.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProfile {
    /// `Accept` for non-AJAX requests.
    pub accept: &'static str,
    /// Sends `Origin: <base>` on every request.
    pub send_origin: bool,
    /// AJAX requests also get an `xhr=true` query flag.
    pub ajax_query_flag: bool,
}

impl HeaderProfile {
    pub const HTML: Self = Self {
        accept: HTML_ACCEPT,
        send_origin: false,
        ajax_query_flag: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Page,
    Ajax,
}

/// Raw result of a form or JSON post. Posts never follow redirects, so a
/// 3xx is a normal outcome here.
#[derive(Debug, Clone)]
pub struct PostResponse {
    pub status: u16,
    pub body: String,
}

impl PostResponse {
    /// Parses the body as JSON, `None` when it is not JSON.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Cookie-threading HTTP client bound to one upstream origin.
#[derive(Debug, Clone)]
pub struct SiteClient {
    client: Client,
    no_redirect: Client,
    base: Url,
    profile: HeaderProfile,
}

impl SiteClient {
    /// Creates a client for `base_url` with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] for a malformed base URL, or
    /// [`ScraperError::Http`] if the underlying `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        profile: HeaderProfile,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ScraperError> {
        let base = parse_base(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        let no_redirect = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            no_redirect,
            base,
            profile,
        })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Base URL without a trailing slash, for building absolute links.
    #[must_use]
    pub fn origin(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_owned()
    }

    /// GETs a page and returns its body.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] for non-2xx responses and
    /// [`ScraperError::Http`] for transport failures.
    pub async fn fetch_html(
        &self,
        path: &str,
        jar: &mut CookieJar,
    ) -> Result<String, ScraperError> {
        self.get_text(path, jar, RequestKind::Page).await
    }

    /// GETs a fragment the way the site's own scripts do.
    ///
    /// # Errors
    ///
    /// Same as [`SiteClient::fetch_html`].
    pub async fn fetch_ajax(
        &self,
        path: &str,
        jar: &mut CookieJar,
    ) -> Result<String, ScraperError> {
        self.get_text(path, jar, RequestKind::Ajax).await
    }

    /// GETs and deserializes a JSON document.
    ///
    /// # Errors
    ///
    /// Same as [`SiteClient::fetch_html`], plus [`ScraperError::Deserialize`]
    /// when the body does not match `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        jar: &mut CookieJar,
    ) -> Result<T, ScraperError> {
        let body = self.get_text(path, jar, RequestKind::Page).await?;
        decode_json(path, &body)
    }

    /// AJAX variant of [`SiteClient::fetch_json`].
    ///
    /// # Errors
    ///
    /// Same as [`SiteClient::fetch_json`].
    pub async fn fetch_ajax_json<T: DeserializeOwned>(
        &self,
        path: &str,
        jar: &mut CookieJar,
    ) -> Result<T, ScraperError> {
        let body = self.get_text(path, jar, RequestKind::Ajax).await?;
        decode_json(path, &body)
    }

    /// Posts a urlencoded form as an AJAX call with `Referer` set to
    /// `referer_path`. Redirects are not followed.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] for transport failures. Any status is
    /// returned to the caller.
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        jar: &mut CookieJar,
        referer_path: &str,
    ) -> Result<PostResponse, ScraperError> {
        let url = resolve(&self.base, path)?;
        let referer = resolve(&self.base, referer_path)?;
        let request = self
            .no_redirect
            .post(url)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_PL)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
            .header(ORIGIN, self.origin())
            .header(REFERER, referer.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .body(encode_form(fields));
        self.send_post(request, jar).await
    }

    /// Posts a JSON body. Redirects are not followed.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] for transport failures. Any status is
    /// returned to the caller.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        jar: &mut CookieJar,
    ) -> Result<PostResponse, ScraperError> {
        let url = resolve(&self.base, path)?;
        let request = self
            .no_redirect
            .post(url)
            .header(ACCEPT, JSON_ACCEPT)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_PL)
            .header(ORIGIN, self.origin())
            .header(REFERER, format!("{}/", self.origin()))
            .json(body);
        self.send_post(request, jar).await
    }

    async fn send_post(
        &self,
        request: RequestBuilder,
        jar: &mut CookieJar,
    ) -> Result<PostResponse, ScraperError> {
        let response = with_cookies(request, jar).send().await?;
        absorb_cookies(response.headers(), jar);
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(PostResponse { status, body })
    }

    async fn get_text(
        &self,
        path: &str,
        jar: &mut CookieJar,
        kind: RequestKind,
    ) -> Result<String, ScraperError> {
        let mut url = resolve(&self.base, path)?;
        let accept = match kind {
            RequestKind::Page => self.profile.accept,
            RequestKind::Ajax => "*/*",
        };
        if kind == RequestKind::Ajax && self.profile.ajax_query_flag {
            url.query_pairs_mut().append_pair("xhr", "true");
        }

        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_PL)
            .header(REFERER, format!("{}/", self.origin()));
        if self.profile.send_origin {
            request = request.header(ORIGIN, self.origin());
        }
        if kind == RequestKind::Ajax {
            request = request.header("X-Requested-With", "XMLHttpRequest");
        }

        let response = with_cookies(request, jar).send().await?;
        absorb_cookies(response.headers(), jar);
        read_success(response, url.as_str()).await
    }
}

fn with_cookies(request: RequestBuilder, jar: &CookieJar) -> RequestBuilder {
    if jar.is_empty() {
        request
    } else {
        request.header(COOKIE, jar.header_value())
    }
}

fn absorb_cookies(headers: &HeaderMap, jar: &mut CookieJar) {
    jar.merge_headers(
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok()),
    );
}

async fn read_success(response: Response, url: &str) -> Result<String, ScraperError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }
    Ok(response.text().await?)
}

fn decode_json<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ScraperError> {
    serde_json::from_str(body).map_err(|e| ScraperError::Deserialize {
        context: path.to_owned(),
        source: e,
    })
}

/// `application/x-www-form-urlencoded` body with `encodeURIComponent` escaping.
fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", encode_component(name), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Escapes a query or form component the way browsers' `encodeURIComponent` does.
#[must_use]
pub fn encode_component(value: &str) -> String {
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

    const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'!')
        .remove(b'~')
        .remove(b'*')
        .remove(b'\'')
        .remove(b'(')
        .remove(b')');
    utf8_percent_encode(value, COMPONENT).to_string()
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
