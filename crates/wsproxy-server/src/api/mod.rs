mod actions;
mod auth;
mod catalog;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use wsproxy_db::{AnyStore, DbError, SessionStore};
use wsproxy_scraper::{ScraperError, Sites};
use wsproxy_session::{AuthError, SessionPolicy};

use crate::middleware::{request_id, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub sites: Arc<Sites>,
    pub store: AnyStore,
    pub policy: SessionPolicy,
    pub auth: AuthState,
}

/// Error answered as `{"error": message}` with the matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<ScraperError> for ApiError {
    fn from(error: ScraperError) -> Self {
        match error {
            ScraperError::Unsupported { .. } => Self::bad_request(error.to_string()),
            _ => {
                tracing::warn!(error = %error, status = ?error.status(), "upstream fetch failed");
                Self::new(StatusCode::BAD_GATEWAY, error.to_string())
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        tracing::error!(error = %error, "session store query failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "session store query failed")
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingField(_) | AuthError::Rejected(_) => {
                Self::bad_request(error.to_string())
            }
            AuthError::Expired => Self::new(StatusCode::GONE, error.to_string()),
            AuthError::Store(error) => error.into(),
            AuthError::Upstream(error) => error.into(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct HealthData {
    status: &'static str,
    store: &'static str,
    request_id: String,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/sites/{site}", post(actions::site_action))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                store: "ok",
                request_id: req_id.0,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: session store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    store: "unavailable",
                    request_id: req_id.0,
                }),
            )
        }
    }
}
