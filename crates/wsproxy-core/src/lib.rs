mod app_config;
mod config;
pub mod integration;
pub mod jar;
pub mod site;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use integration::{
    Credentials, Integration, IntegrationContext, PendingChallenge, SessionCredentials,
};
pub use jar::CookieJar;
pub use site::{Site, UnknownSite};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
