//! Onninen: JSON catalog API and a JSON login with an SMS second factor.

mod api;

use serde::Serialize;
use serde_json::{json, Value};
use wsproxy_core::CookieJar;

use crate::auth::{AccountInfo, SignInOutcome, SiteAuth};
use crate::client::{encode_component, HeaderProfile, SiteClient, JSON_ACCEPT};
use crate::error::ScraperError;
use crate::sites::scalar_string;
use crate::types::CategoryEntry;

pub use api::{
    card_body, category_tree, CatalogProduct, PriceTier, ProductCard, ProductPage, RawCard,
    RawProduct, RawSearch, Variant, PAGE_SIZE,
};

pub const HEADER_PROFILE: HeaderProfile = HeaderProfile {
    accept: JSON_ACCEPT,
    send_origin: true,
    ajax_query_flag: false,
};

const LOGIN_PATH: &str = "/api/login";
const USERINFO_PATH: &str = "/api/userinfo?query=user,availableCustomers,salesman,storelc,pricetype";
const PROBE_PATH: &str = "/api/userinfo?query=user";

const CODE_SENT: &str = "Kod SMS został wysłany na Twój numer telefonu";
const CODE_RESENT: &str = "Kod SMS wysłany ponownie";
const WRONG_CODE: &str = "Nieprawidłowy kod. Spróbuj ponownie.";
const LOGIN_FAILED: &str = "Logowanie nieudane";

/// `status` values meaning the account may not log in at all.
const NO_ACCESS: &[&str] = &["noaccess", "no_access", "denied", "blocked"];

/// Result of browsing a catalog slug.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OnninenPage {
    Product { product: Box<ProductCard> },
    List(ProductPage),
}

/// What one `/api/login` reply asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginReply {
    Ok,
    Challenge(Option<String>),
    Rejected(String),
    /// Not ok and not recognized: treated as a challenge.
    Other(Option<String>),
}

#[derive(Debug, Clone)]
pub struct OnninenSite {
    client: SiteClient,
}

impl OnninenSite {
    #[must_use]
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }

    /// Category tree.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the groups endpoint fails or is not JSON.
    pub async fn categories(
        &self,
        jar: &mut CookieJar,
    ) -> Result<Vec<CategoryEntry>, ScraperError> {
        let body: Value = self
            .client
            .fetch_json("/api/groups?grouptype=categories", jar)
            .await?;
        Ok(category_tree(&body))
    }

    /// One page of a category. `category` is its slug, with or without a
    /// leading slash.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the search endpoint fails or is not JSON.
    pub async fn products(
        &self,
        category: &str,
        page: u32,
        jar: &mut CookieJar,
    ) -> Result<ProductPage, ScraperError> {
        let slug = category.trim_start_matches('/');
        let encoded: Vec<String> = slug.split('/').map(encode_component).collect();
        self.search_page(&format!("/{}", encoded.join("/")), page, jar).await
    }

    /// Full-text search.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the search endpoint fails or is not JSON.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        jar: &mut CookieJar,
    ) -> Result<ProductPage, ScraperError> {
        self.search_page(&encode_component(query.trim()), page, jar).await
    }

    /// Product card by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the card endpoint fails or is not JSON.
    pub async fn product(
        &self,
        slug: &str,
        jar: &mut CookieJar,
    ) -> Result<ProductCard, ScraperError> {
        let slug = slug.trim_start_matches('/').trim_start_matches("product/");
        let path = format!("/api/card?slug={}", encode_component(slug));
        let response: Value = self.client.fetch_json(&path, jar).await?;
        let card: RawCard =
            serde_json::from_value(card_body(response)).map_err(|e| ScraperError::Deserialize {
                context: path,
                source: e,
            })?;
        let mut card = card.into_card(&self.client.origin());
        if card.product.slug.is_empty() {
            card.product.slug = slug.to_owned();
            card.product.url = format!("{}/product/{slug}", self.client.origin());
        }
        Ok(card)
    }

    /// Product card for `product/...` slugs, first page of a category otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`OnninenSite::product`] and [`OnninenSite::products`].
    pub async fn browse(
        &self,
        slug: &str,
        jar: &mut CookieJar,
    ) -> Result<OnninenPage, ScraperError> {
        let trimmed = slug.trim_start_matches('/');
        if trimmed.starts_with("product/") || trimmed.contains("/product/") {
            let slug = trimmed.rsplit("product/").next().unwrap_or(trimmed);
            let product = self.product(slug, jar).await?;
            return Ok(OnninenPage::Product {
                product: Box::new(product),
            });
        }
        Ok(OnninenPage::List(self.products(trimmed, 1, jar).await?))
    }

    async fn search_page(
        &self,
        query: &str,
        page: u32,
        jar: &mut CookieJar,
    ) -> Result<ProductPage, ScraperError> {
        let page = page.max(1);
        let path = format!("/api/search?query={query}&page={page}");
        let raw: RawSearch = self.client.fetch_json(&path, jar).await?;
        Ok(raw.into_page(page, &self.client.origin()))
    }

    async fn post_login(
        &self,
        body: &Value,
        jar: &mut CookieJar,
    ) -> Result<(LoginReply, u16, Value), ScraperError> {
        let response = self.client.post_json(LOGIN_PATH, body, jar).await?;
        let reply_body = response.json().unwrap_or(Value::Null);
        let reply = classify_reply(response.status, &reply_body);
        tracing::debug!(status = response.status, reply = ?reply, "onninen login step");
        Ok((reply, response.status, reply_body))
    }

    async fn account(&self, jar: &mut CookieJar) -> AccountInfo {
        match self.client.fetch_json::<Value>(USERINFO_PATH, jar).await {
            Ok(info) => account_from_userinfo(&info),
            Err(error) => {
                tracing::warn!(error = %error, "onninen userinfo failed after login");
                AccountInfo::default()
            }
        }
    }
}

impl SiteAuth for OnninenSite {
    async fn sign_in(
        &self,
        jar: &mut CookieJar,
        username: &str,
        password: &str,
    ) -> Result<SignInOutcome, ScraperError> {
        if let Err(error) = self.client.fetch_html("/", jar).await {
            tracing::warn!(error = %error, "onninen home page fetch failed before login");
        }
        let (reply, _, _) = self
            .post_login(&json!({ "userName": username, "password": password }), jar)
            .await?;
        Ok(match reply {
            LoginReply::Ok => SignInOutcome::Authenticated(self.account(jar).await),
            LoginReply::Rejected(message) => SignInOutcome::Rejected { message },
            LoginReply::Challenge(message) | LoginReply::Other(message) => {
                SignInOutcome::NeedsCode {
                    message: message.unwrap_or_else(|| CODE_SENT.to_owned()),
                }
            }
        })
    }

    async fn submit_code(
        &self,
        jar: &mut CookieJar,
        code: &str,
    ) -> Result<SignInOutcome, ScraperError> {
        let body = json!({ "code2Fa": code, "rememberWorkstation": true, "step": 1 });
        let (reply, status, reply_body) = self.post_login(&body, jar).await?;
        Ok(match reply {
            LoginReply::Ok => SignInOutcome::Authenticated(self.account(jar).await),
            LoginReply::Rejected(message) if is_no_access(status, &reply_body) => {
                SignInOutcome::Rejected { message }
            }
            LoginReply::Rejected(message) => SignInOutcome::NeedsCode { message },
            LoginReply::Challenge(_) | LoginReply::Other(_) => SignInOutcome::NeedsCode {
                message: server_message(&reply_body).unwrap_or_else(|| WRONG_CODE.to_owned()),
            },
        })
    }

    async fn resend_code(&self, jar: &mut CookieJar) -> Result<String, ScraperError> {
        let response = self
            .client
            .post_json(LOGIN_PATH, &json!({ "sendAgainType": true }), jar)
            .await?;
        Ok(response
            .json()
            .as_ref()
            .and_then(server_message)
            .unwrap_or_else(|| CODE_RESENT.to_owned()))
    }

    async fn probe(&self, jar: &mut CookieJar) -> Result<Option<AccountInfo>, ScraperError> {
        match self.client.fetch_json::<Value>(PROBE_PATH, jar).await {
            Ok(info) => {
                let user = &info["user"];
                let logged_in = user["loggedin"].as_bool().unwrap_or(false)
                    || scalar_string(&user["email"]).is_some();
                Ok(logged_in.then(|| account_from_userinfo(&info)))
            }
            Err(ScraperError::Deserialize { .. }) => Ok(None),
            Err(error) if matches!(error.status(), Some(401 | 403)) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn classify_reply(status: u16, body: &Value) -> LoginReply {
    if body["status"].as_str() == Some("ok") {
        return LoginReply::Ok;
    }
    let message = server_message(body);
    let challenged = ["code2falength", "desc2faheader"]
        .iter()
        .any(|k| !body[*k].is_null())
        || body["needs2fa"].as_bool() == Some(true)
        || body["twoFactorRequired"].as_bool() == Some(true)
        || body["step"].as_str() == Some("sms");
    if challenged {
        return LoginReply::Challenge(message);
    }
    if let Some(error) = error_text(body) {
        return LoginReply::Rejected(error);
    }
    if is_no_access(status, body) {
        return LoginReply::Rejected(message.unwrap_or_else(|| LOGIN_FAILED.to_owned()));
    }
    LoginReply::Other(message)
}

fn is_no_access(status: u16, body: &Value) -> bool {
    matches!(status, 401 | 403)
        || body["status"]
            .as_str()
            .is_some_and(|s| NO_ACCESS.contains(&s.to_ascii_lowercase().as_str()))
}

/// `error`, or `errors` joined with `; `.
fn error_text(body: &Value) -> Option<String> {
    if let Some(error) = scalar_string(&body["error"]) {
        return Some(error);
    }
    match &body["errors"] {
        Value::Array(all) => {
            let parts: Vec<String> = all
                .iter()
                .filter_map(|e| scalar_string(e).or_else(|| scalar_string(&e["message"])))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        other => scalar_string(other),
    }
}

fn server_message(body: &Value) -> Option<String> {
    scalar_string(&body["message"]).or_else(|| scalar_string(&body["desc2faheader"]))
}

fn account_from_userinfo(info: &Value) -> AccountInfo {
    let customer = &info["currentCustomer"];
    AccountInfo {
        client_id: scalar_string(&customer["idEx"]).or_else(|| scalar_string(&customer["id"])),
        email: scalar_string(&info["user"]["email"]),
        name: scalar_string(&info["user"]["name"]).or_else(|| scalar_string(&customer["nameShort"])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_wins() {
        assert_eq!(classify_reply(200, &json!({"status": "ok", "message": "x"})), LoginReply::Ok);
    }

    #[test]
    fn second_factor_markers_are_challenges() {
        for body in [
            json!({"code2falength": 6, "message": "Podaj kod"}),
            json!({"desc2faheader": "Weryfikacja"}),
            json!({"needs2fa": true}),
            json!({"twoFactorRequired": true}),
            json!({"step": "sms"}),
        ] {
            assert!(matches!(classify_reply(200, &body), LoginReply::Challenge(_)), "{body}");
        }
        assert_eq!(
            classify_reply(200, &json!({"code2falength": 6, "message": "Podaj kod"})),
            LoginReply::Challenge(Some("Podaj kod".to_string()))
        );
    }

    #[test]
    fn errors_are_rejections() {
        assert_eq!(
            classify_reply(200, &json!({"error": "Błędny login lub hasło"})),
            LoginReply::Rejected("Błędny login lub hasło".to_string())
        );
        assert_eq!(
            classify_reply(200, &json!({"errors": ["Konto zablokowane", {"message": "Skontaktuj się z opiekunem"}]})),
            LoginReply::Rejected("Konto zablokowane; Skontaktuj się z opiekunem".to_string())
        );
        assert!(matches!(classify_reply(403, &Value::Null), LoginReply::Rejected(_)));
        assert!(matches!(classify_reply(200, &json!({"status": "NoAccess"})), LoginReply::Rejected(_)));
    }

    #[test]
    fn unknown_non_ok_reply_keeps_server_message() {
        assert_eq!(
            classify_reply(200, &json!({"status": "wait", "message": "Potwierdź logowanie"})),
            LoginReply::Other(Some("Potwierdź logowanie".to_string()))
        );
    }

    #[test]
    fn userinfo_maps_customer_and_user() {
        let account = account_from_userinfo(&json!({
            "user": {"name": "Jan Kowalski", "email": "jan@firma.pl", "loggedin": true},
            "currentCustomer": {"idEx": 771203, "nameShort": "ELEKTRO-JAN"}
        }));
        assert_eq!(account.client_id.as_deref(), Some("771203"));
        assert_eq!(account.email.as_deref(), Some("jan@firma.pl"));
        assert_eq!(account.name.as_deref(), Some("Jan Kowalski"));
    }

    #[test]
    fn browse_page_serializes_with_type_tag() {
        let page = OnninenPage::List(ProductPage {
            page: 1,
            total_pages: 1,
            ..ProductPage::default()
        });
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["type"], "list");
        assert_eq!(json["totalPages"], 1);
    }
}
