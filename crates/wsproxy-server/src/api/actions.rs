//! `POST /api/v1/sites/{site}`: one endpoint, the action named in the body.

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use wsproxy_core::Site;

use super::{auth, catalog, ApiError, AppState};

/// Request body. Which fields matter depends on `action`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub action: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub company_id: Option<String>,
    pub wholesaler_id: Option<String>,
    pub wholesaler_name: Option<String>,
    pub branza: Option<String>,
    pub existing_integration_id: Option<Uuid>,
    pub temp_id: Option<String>,
    pub code2fa: Option<String>,
    pub integration_id: Option<Uuid>,
    pub slug: Option<String>,
    pub q: Option<String>,
    pub cat: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Login2fa,
    Resend2fa,
    Logout,
    Session,
    Categories,
    Browse,
    Product,
    Search,
    Products,
}

impl Action {
    /// Actions that touch stored credentials need a bearer token.
    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            Action::Login | Action::Login2fa | Action::Resend2fa | Action::Logout
        )
    }
}

impl FromStr for Action {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "login" => Action::Login,
            "login2fa" => Action::Login2fa,
            "resend2fa" => Action::Resend2fa,
            "logout" => Action::Logout,
            "session" => Action::Session,
            "categories" => Action::Categories,
            "browse" => Action::Browse,
            "product" => Action::Product,
            "search" => Action::Search,
            "products" => Action::Products,
            other => return Err(ApiError::bad_request(format!("Unknown action: {other}"))),
        })
    }
}

pub(super) async fn site_action(
    State(state): State<AppState>,
    Path(site): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let site: Site = site
        .parse()
        .map_err(|_| ApiError::new(StatusCode::NOT_FOUND, format!("Unknown site: {site}")))?;
    let Json(request) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let action: Action = request.action.parse()?;

    if action.requires_auth() && !state.auth.authorizes(&headers) {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Authentication required"));
    }

    tracing::info!(site = %site, action = %request.action, "site action");

    match action {
        Action::Login | Action::Login2fa | Action::Resend2fa | Action::Logout | Action::Session => {
            auth::handle(&state, site, action, request).await
        }
        Action::Categories
        | Action::Browse
        | Action::Product
        | Action::Search
        | Action::Products => {
            catalog::handle(&state, site, action, request).await
        }
    }
}

/// Trimmed value of an optional text field, `None` when blank.
pub(super) fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
