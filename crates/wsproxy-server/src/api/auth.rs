//! Login, SMS code, logout and session status actions.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use wsproxy_core::{IntegrationContext, Site};
use wsproxy_scraper::{Authenticator, ScraperError};
use wsproxy_session::{session_status, LoginFlow, LoginRequest, LoginResult};

use super::actions::{non_blank, Action, ActionRequest};
use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum LoginReply {
    #[serde(rename_all = "camelCase")]
    Authenticated {
        success: bool,
        integration_id: Uuid,
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    NeedsCode {
        needs2fa: bool,
        temp_id: String,
        message: String,
    },
}

impl From<LoginResult> for LoginReply {
    fn from(result: LoginResult) -> Self {
        match result {
            LoginResult::Authenticated {
                integration_id,
                username,
                client_id,
            } => Self::Authenticated {
                success: true,
                integration_id,
                username,
                client_id,
            },
            LoginResult::NeedsCode { temp_id, message } => Self::NeedsCode {
                needs2fa: true,
                temp_id,
                message,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SuccessReply {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub(super) async fn handle(
    state: &AppState,
    site: Site,
    action: Action,
    request: ActionRequest,
) -> Result<Response, ApiError> {
    let auth = authenticator(state, site)?;
    let flow = LoginFlow::new(&auth, &state.store, state.policy.pending_ttl);

    match action {
        Action::Login => {
            let (Some(username), Some(password)) = (
                non_blank(request.username.as_ref()),
                request.password.as_deref().filter(|p| !p.is_empty()),
            ) else {
                return Err(ApiError::bad_request("Username + password required"));
            };
            let result = flow
                .login(LoginRequest {
                    username: username.to_owned(),
                    password: password.to_owned(),
                    context: context_of(&request),
                    existing_integration_id: request.existing_integration_id,
                })
                .await?;
            Ok(Json(LoginReply::from(result)).into_response())
        }
        Action::Login2fa => {
            let (Some(temp_id), Some(code)) = (
                non_blank(request.temp_id.as_ref()),
                non_blank(request.code2fa.as_ref()),
            ) else {
                return Err(ApiError::bad_request("tempId + code2fa required"));
            };
            let result = flow.verify(temp_id, code).await?;
            Ok(Json(LoginReply::from(result)).into_response())
        }
        Action::Resend2fa => {
            let Some(temp_id) = non_blank(request.temp_id.as_ref()) else {
                return Err(ApiError::bad_request("tempId required"));
            };
            let message = flow.resend(temp_id).await?;
            Ok(Json(SuccessReply {
                success: true,
                message: Some(message),
            })
            .into_response())
        }
        Action::Logout => {
            let Some(integration_id) = request.integration_id else {
                return Err(ApiError::bad_request("integrationId required"));
            };
            flow.logout(integration_id).await?;
            Ok(Json(SuccessReply {
                success: true,
                message: None,
            })
            .into_response())
        }
        Action::Session => {
            let Some(integration_id) = request.integration_id else {
                return Err(ApiError::bad_request("integrationId required"));
            };
            let status = session_status(&auth, &state.store, integration_id).await;
            Ok(Json(status).into_response())
        }
        Action::Categories
        | Action::Browse
        | Action::Product
        | Action::Search
        | Action::Products => {
            Err(ApiError::bad_request(format!("Unknown action: {}", request.action)))
        }
    }
}

fn authenticator(state: &AppState, site: Site) -> Result<Authenticator<'_>, ApiError> {
    state.sites.authenticator(site).ok_or_else(|| {
        ScraperError::Unsupported {
            site: site.as_str(),
            operation: "login",
        }
        .into()
    })
}

fn context_of(request: &ActionRequest) -> IntegrationContext {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    IntegrationContext {
        company_id: field(&request.company_id),
        wholesaler_id: field(&request.wholesaler_id),
        wholesaler_name: field(&request.wholesaler_name),
        branza: field(&request.branza),
    }
}
