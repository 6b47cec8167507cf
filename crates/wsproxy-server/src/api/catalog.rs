//! Catalog actions. Each runs with the integration's session when one
//! resolves and anonymously otherwise; `source` tells which.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use wsproxy_core::Site;
use wsproxy_scraper::{CategoryEntry, ProductPage, ScraperError};
use wsproxy_session::{resolve_session, ResolvedSession, SessionSource};

use super::actions::{non_blank, Action, ActionRequest};
use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
struct CategoriesReply {
    categories: Vec<CategoryEntry>,
    total: usize,
    source: SessionSource,
}

#[derive(Debug, Serialize)]
struct BrowseReply<P: Serialize> {
    #[serde(flatten)]
    page: P,
    source: SessionSource,
}

#[derive(Debug, Serialize)]
struct ProductReply<P: Serialize> {
    product: P,
    source: SessionSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchReply<T: Serialize> {
    products: Vec<T>,
    query: String,
    total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_pages: Option<u64>,
    source: SessionSource,
}

pub(super) async fn handle(
    state: &AppState,
    site: Site,
    action: Action,
    request: ActionRequest,
) -> Result<Response, ApiError> {
    match action {
        Action::Categories => categories(state, site, request.integration_id).await,
        Action::Browse | Action::Product => {
            let Some(slug) = non_blank(request.slug.as_ref()) else {
                return Err(ApiError::bad_request("Missing slug"));
            };
            if action == Action::Browse {
                browse(state, site, request.integration_id, slug).await
            } else {
                product(state, site, request.integration_id, slug).await
            }
        }
        Action::Search => {
            let Some(query) = non_blank(request.q.as_ref()) else {
                return Err(ApiError::bad_request("Missing q"));
            };
            let page = request.page.unwrap_or(1).max(1);
            search(state, site, request.integration_id, query, page).await
        }
        Action::Products => {
            let Some(category) = non_blank(request.cat.as_ref()) else {
                return Err(ApiError::bad_request("Missing cat"));
            };
            let page = request.page.unwrap_or(1).max(1);
            products(state, site, request.integration_id, category, page).await
        }
        Action::Login | Action::Login2fa | Action::Resend2fa | Action::Logout | Action::Session => {
            Err(ApiError::bad_request(format!("Unknown action: {}", request.action)))
        }
    }
}

/// The jar to fetch with. Anonymous-only sites never look at the store.
async fn session(state: &AppState, site: Site, integration_id: Option<Uuid>) -> ResolvedSession {
    match state.sites.authenticator(site) {
        Some(auth) => resolve_session(&auth, &state.store, integration_id, &state.policy).await,
        None => ResolvedSession::public(),
    }
}

async fn categories(
    state: &AppState,
    site: Site,
    integration_id: Option<Uuid>,
) -> Result<Response, ApiError> {
    let ResolvedSession { mut jar, source } = session(state, site, integration_id).await;
    let categories = match site {
        Site::Atut => state.sites.atut.categories().await?,
        Site::Ramirent => state.sites.ramirent.categories(&mut jar).await?,
        Site::Onninen => state.sites.onninen.categories(&mut jar).await?,
    };
    Ok(Json(CategoriesReply {
        total: categories.len(),
        categories,
        source,
    })
    .into_response())
}

async fn browse(
    state: &AppState,
    site: Site,
    integration_id: Option<Uuid>,
    slug: &str,
) -> Result<Response, ApiError> {
    let ResolvedSession { mut jar, source } = session(state, site, integration_id).await;
    let response = match site {
        Site::Atut => {
            let page = state.sites.atut.browse(slug).await?;
            Json(BrowseReply { page, source }).into_response()
        }
        Site::Ramirent => {
            let page = state.sites.ramirent.browse(slug, &mut jar).await?;
            Json(BrowseReply { page, source }).into_response()
        }
        Site::Onninen => {
            let page = state.sites.onninen.browse(slug, &mut jar).await?;
            Json(BrowseReply { page, source }).into_response()
        }
    };
    Ok(response)
}

async fn product(
    state: &AppState,
    site: Site,
    integration_id: Option<Uuid>,
    slug: &str,
) -> Result<Response, ApiError> {
    let ResolvedSession { mut jar, source } = session(state, site, integration_id).await;
    let response = match site {
        Site::Atut => {
            let product = state.sites.atut.product(slug).await?;
            Json(ProductReply { product, source }).into_response()
        }
        Site::Ramirent => {
            let product = state.sites.ramirent.product(slug, &mut jar).await?;
            Json(ProductReply { product, source }).into_response()
        }
        Site::Onninen => {
            let product = state.sites.onninen.product(slug, &mut jar).await?;
            Json(ProductReply { product, source }).into_response()
        }
    };
    Ok(response)
}

async fn search(
    state: &AppState,
    site: Site,
    integration_id: Option<Uuid>,
    query: &str,
    page: u32,
) -> Result<Response, ApiError> {
    let ResolvedSession { mut jar, source } = session(state, site, integration_id).await;
    let response = match site {
        Site::Atut | Site::Ramirent => {
            let products = if site == Site::Atut {
                state.sites.atut.search(query).await?
            } else {
                state.sites.ramirent.search(query, &mut jar).await?
            };
            Json(SearchReply {
                total: u64::try_from(products.len()).unwrap_or(u64::MAX),
                products,
                query: query.to_owned(),
                page: None,
                total_pages: None,
                source,
            })
            .into_response()
        }
        Site::Onninen => {
            let ProductPage {
                products,
                page,
                total_pages,
                total_products,
                ..
            } = state.sites.onninen.search(query, page, &mut jar).await?;
            Json(SearchReply {
                products,
                query: query.to_owned(),
                total: total_products,
                page: Some(page),
                total_pages: Some(total_pages),
                source,
            })
            .into_response()
        }
    };
    Ok(response)
}

async fn products(
    state: &AppState,
    site: Site,
    integration_id: Option<Uuid>,
    category: &str,
    page: u32,
) -> Result<Response, ApiError> {
    if site != Site::Onninen {
        return Err(ScraperError::Unsupported {
            site: site.as_str(),
            operation: "products",
        }
        .into());
    }
    let ResolvedSession { mut jar, source } = session(state, site, integration_id).await;
    let page = state.sites.onninen.products(category, page, &mut jar).await?;
    Ok(Json(BrowseReply { page, source }).into_response())
}
