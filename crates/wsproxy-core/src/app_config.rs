use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Absent only in development, where the server falls back to an in-memory store.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    /// A session refreshed within this window is reused without probing.
    pub session_fresh_secs: u64,
    /// Lifetime of a pending SMS challenge.
    pub pending_ttl_secs: u64,
    pub atut_base_url: String,
    pub ramirent_base_url: String,
    pub onninen_base_url: String,
}

impl AppConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.env == Environment::Development
    }

    #[must_use]
    pub fn session_fresh_window(&self) -> chrono::Duration {
        saturating_seconds(self.session_fresh_secs)
    }

    #[must_use]
    pub fn pending_ttl(&self) -> chrono::Duration {
        saturating_seconds(self.pending_ttl_secs)
    }
}

/// Out-of-range values clamp to [`chrono::Duration::MAX`].
fn saturating_seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("session_fresh_secs", &self.session_fresh_secs)
            .field("pending_ttl_secs", &self.pending_ttl_secs)
            .field("atut_base_url", &self.atut_base_url)
            .field("ramirent_base_url", &self.ramirent_base_url)
            .field("onninen_base_url", &self.onninen_base_url)
            .finish()
    }
}
