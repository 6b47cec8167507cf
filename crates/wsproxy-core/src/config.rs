use crate::app_config::{AppConfig, Environment};
use crate::site::Site;
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so tests
/// can drive them with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_base_url = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            Ok(trimmed.to_string())
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected an http(s) origin, got \"{raw}\""),
            })
        }
    };

    let env = parse_environment(&or_default("WSPROXY_ENV", "development"))?;

    let database_url = if env == Environment::Development {
        lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty())
    } else {
        Some(require("DATABASE_URL")?)
    };

    let api_keys = parse_api_keys(&or_default("WSPROXY_API_KEYS", ""));
    if api_keys.is_empty() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("WSPROXY_API_KEYS".to_string()));
    }

    let bind_addr = parse("WSPROXY_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("WSPROXY_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("WSPROXY_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("WSPROXY_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("WSPROXY_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("WSPROXY_SCRAPER_REQUEST_TIMEOUT_SECS", "25")?;
    let scraper_user_agent = or_default("WSPROXY_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);

    let session_fresh_secs = parse_u64("WSPROXY_SESSION_FRESH_SECS", "1800")?;
    let pending_ttl_secs = parse_u64("WSPROXY_PENDING_TTL_SECS", "600")?;

    let atut_base_url = parse_base_url("WSPROXY_ATUT_BASE_URL", Site::Atut.default_base_url())?;
    let ramirent_base_url =
        parse_base_url("WSPROXY_RAMIRENT_BASE_URL", Site::Ramirent.default_base_url())?;
    let onninen_base_url =
        parse_base_url("WSPROXY_ONNINEN_BASE_URL", Site::Onninen.default_base_url())?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        session_fresh_secs,
        pending_ttl_secs,
        atut_base_url,
        ramirent_base_url,
        onninen_base_url,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "WSPROXY_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Splits a comma-separated bearer token list, dropping blanks.
fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
