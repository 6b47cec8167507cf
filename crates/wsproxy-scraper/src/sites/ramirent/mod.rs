//! Ramirent: server-rendered equipment groups with prices behind an XHR
//! fragment, and a form login whose session is read back from `/ajax/init`.

mod parse;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wsproxy_core::CookieJar;

use crate::auth::{AccountInfo, SignInOutcome, SiteAuth};
use crate::classify::PageKind;
use crate::client::{encode_component, HeaderProfile, SiteClient, HTML_ACCEPT};
use crate::error::ScraperError;
use crate::markup;
use crate::sites::scalar_string;
use crate::types::{CategoryEntry, ListItem};

pub use parse::{
    detect_kind, parse_categories, parse_category_items, parse_detail, parse_group,
    parse_related, search_items, AvailabilityDetail, EquipmentGroup, SearchResponse,
    DEFAULT_UNIT,
};

pub const HEADER_PROFILE: HeaderProfile = HeaderProfile {
    accept: HTML_ACCEPT,
    send_origin: false,
    ajax_query_flag: true,
};

const CATALOG_PATH: &str = "/wynajem";
const LOGIN_PATH: &str = "/konto?basket=1";
const INIT_PATH: &str = "/ajax/init";
const REJECTED_MESSAGE: &str = "Logowanie nieudane: niepoprawne dane logowania";

/// Detail fragments shorter than this are empty placeholders.
const MIN_DETAIL_BYTES: usize = 50;

/// Result of browsing a catalog path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RamirentPage {
    Category { title: String, items: Vec<ListItem> },
    Group { group: Box<EquipmentGroup> },
}

#[derive(Debug, Default, Deserialize)]
struct InitResponse {
    #[serde(default)]
    account: Option<InitAccount>,
}

#[derive(Debug, Default, Deserialize)]
struct InitAccount {
    #[serde(default)]
    client_id: Value,
    #[serde(default)]
    client_login: Option<String>,
}

impl InitResponse {
    fn account_info(self) -> Option<AccountInfo> {
        let account = self.account?;
        let client_id = scalar_string(&account.client_id).filter(|id| id != "0")?;
        Some(AccountInfo {
            client_id: Some(client_id),
            email: account.client_login,
            name: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RamirentSite {
    client: SiteClient,
}

impl RamirentSite {
    #[must_use]
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }

    /// Top-level equipment categories.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if `/wynajem` cannot be fetched.
    pub async fn categories(
        &self,
        jar: &mut CookieJar,
    ) -> Result<Vec<CategoryEntry>, ScraperError> {
        let html = self.client.fetch_html(CATALOG_PATH, jar).await?;
        Ok(parse_categories(&html, self.client.base()))
    }

    /// Fetches `slug` and returns its tiles or its equipment group.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the page cannot be fetched.
    pub async fn browse(
        &self,
        slug: &str,
        jar: &mut CookieJar,
    ) -> Result<RamirentPage, ScraperError> {
        let path = page_path(slug);
        let html = self.client.fetch_html(&path, jar).await?;
        if detect_kind(&path, &html) == PageKind::CategoryListing {
            let cleaned = markup::strip_noise(&html);
            return Ok(RamirentPage::Category {
                title: markup::first_heading(&cleaned).unwrap_or_default(),
                items: parse_category_items(&cleaned, self.client.base()),
            });
        }
        let group = self.complete_group(parse_group(&html, self.client.base()), &path, jar).await;
        Ok(RamirentPage::Group {
            group: Box::new(group),
        })
    }

    /// Equipment group with prices, availability and related groups.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the group page cannot be fetched. The XHR
    /// follow-ups are best-effort.
    pub async fn product(
        &self,
        slug: &str,
        jar: &mut CookieJar,
    ) -> Result<EquipmentGroup, ScraperError> {
        let path = page_path(slug);
        let html = self.client.fetch_html(&path, jar).await?;
        Ok(self.complete_group(parse_group(&html, self.client.base()), &path, jar).await)
    }

    /// Search via the autocomplete endpoint, falling back to the results page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] only if both sources fail.
    pub async fn search(
        &self,
        query: &str,
        jar: &mut CookieJar,
    ) -> Result<Vec<ListItem>, ScraperError> {
        let path = format!("/wyszukiwarka?str={}", encode_component(query));
        match self.client.fetch_ajax_json::<SearchResponse>(&path, jar).await {
            Ok(response) => Ok(search_items(response, self.client.base())),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "ramirent search endpoint failed, reading results page"
                );
                let html = self.client.fetch_html(&path, jar).await?;
                let cleaned = markup::strip_noise(&html);
                Ok(parse::equipment_boxes(&cleaned, self.client.base()))
            }
        }
    }

    async fn complete_group(
        &self,
        mut group: EquipmentGroup,
        path: &str,
        jar: &mut CookieJar,
    ) -> EquipmentGroup {
        let detail_path = if group.detail_url.is_empty() {
            path.to_owned()
        } else {
            group.detail_url.clone()
        };
        match self.client.fetch_ajax(&detail_path, jar).await {
            Ok(fragment) if fragment.trim().len() > MIN_DETAIL_BYTES => {
                group.apply_detail(parse_detail(&fragment));
            }
            Ok(_) => tracing::debug!(path = %detail_path, "empty ramirent detail fragment"),
            Err(error) => {
                tracing::warn!(
                    path = %detail_path,
                    error = %error,
                    "ramirent detail fetch failed"
                );
            }
        }

        if !group.group_id.is_empty() {
            let related_path = format!("/ajax/groupsConnections/{}", group.group_id);
            match self.client.fetch_ajax(&related_path, jar).await {
                Ok(fragment) => group.related = parse_related(&fragment, self.client.base()),
                Err(error) => {
                    tracing::warn!(
                        path = %related_path,
                        error = %error,
                        "ramirent related fetch failed"
                    );
                }
            }
        }
        group
    }

    async fn read_init(&self, jar: &mut CookieJar) -> Result<Option<AccountInfo>, ScraperError> {
        match self.client.fetch_ajax_json::<InitResponse>(INIT_PATH, jar).await {
            Ok(init) => Ok(init.account_info()),
            Err(ScraperError::Deserialize { context, .. }) => {
                tracing::debug!(context = %context, "ramirent init is not JSON, no session");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

impl SiteAuth for RamirentSite {
    async fn sign_in(
        &self,
        jar: &mut CookieJar,
        username: &str,
        password: &str,
    ) -> Result<SignInOutcome, ScraperError> {
        if let Err(error) = self.client.fetch_html("/", jar).await {
            tracing::warn!(error = %error, "ramirent home page fetch failed before login");
        }
        let response = self
            .client
            .post_form(
                LOGIN_PATH,
                &[
                    ("account_login", username),
                    ("account_password", password),
                    ("account_mode", "login"),
                ],
                jar,
                LOGIN_PATH,
            )
            .await?;
        tracing::debug!(status = response.status, "ramirent login form posted");

        Ok(match self.read_init(jar).await? {
            Some(account) => SignInOutcome::Authenticated(account),
            None => SignInOutcome::Rejected {
                message: REJECTED_MESSAGE.to_owned(),
            },
        })
    }

    async fn submit_code(
        &self,
        _jar: &mut CookieJar,
        _code: &str,
    ) -> Result<SignInOutcome, ScraperError> {
        Err(ScraperError::Unsupported {
            site: "ramirent",
            operation: "2fa",
        })
    }

    async fn resend_code(&self, _jar: &mut CookieJar) -> Result<String, ScraperError> {
        Err(ScraperError::Unsupported {
            site: "ramirent",
            operation: "2fa",
        })
    }

    async fn probe(&self, jar: &mut CookieJar) -> Result<Option<AccountInfo>, ScraperError> {
        self.read_init(jar).await
    }
}

fn page_path(slug: &str) -> String {
    if slug.starts_with('/') {
        slug.to_owned()
    } else {
        format!("/{slug}")
    }
}
