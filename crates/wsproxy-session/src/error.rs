use thiserror::Error;
use wsproxy_db::DbError;
use wsproxy_scraper::ScraperError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} required")]
    MissingField(&'static str),
    /// The pending challenge is gone or older than its lifetime.
    #[error("2FA session expired. Please login again.")]
    Expired,
    /// The site refused the credentials or the account.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Upstream(#[from] ScraperError),
}
