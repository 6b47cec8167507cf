use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{site} does not support {operation}")]
    Unsupported {
        site: &'static str,
        operation: &'static str,
    },
}

impl ScraperError {
    /// Upstream HTTP status, when the failure carried one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ScraperError::UnexpectedStatus { status, .. } => Some(*status),
            ScraperError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
