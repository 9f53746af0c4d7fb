//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HOBY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `HOBY_HOST` - Bind address (default: 127.0.0.1)
//! - `HOBY_PORT` - Listen port (default: 8080)
//! - `HOBY_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `NOTIFICATION_QUEUE_CAPACITY` - Pending order notifications before new ones are dropped
//!   (default: 256)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for text

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_MAX_CONNECTIONS: &str = "10";
const DEFAULT_QUEUE_CAPACITY: &str = "256";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Capacity of the order notification queue
    pub notification_queue_capacity: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    pub log_format: LogFormat,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env.database_url("HOBY_DATABASE_URL")?;
        let host = env.parsed::<IpAddr>("HOBY_HOST", DEFAULT_HOST)?;
        let port = env.parsed::<u16>("HOBY_PORT", DEFAULT_PORT)?;
        let max_connections =
            env.parsed::<u32>("HOBY_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let notification_queue_capacity =
            env.parsed::<usize>("NOTIFICATION_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;
        if notification_queue_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "NOTIFICATION_QUEUE_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let log_format = match env.optional("LOG_FORMAT") {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
            notification_queue_capacity,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load only the database URL, for tools that do not serve HTTP.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `HOBY_DATABASE_URL` nor
/// `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    Env(|key: &str| std::env::var(key).ok()).database_url("HOBY_DATABASE_URL")
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Parse a variable, using `default` when it is unset.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .unwrap_or_else(|| default.to_string())
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("HOBY_DATABASE_URL", "postgres://localhost/hoby")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.notification_queue_capacity, 256);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fly/hoby")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly/hoby");

        let config = load(&[
            ("HOBY_DATABASE_URL", "postgres://primary/hoby"),
            ("DATABASE_URL", "postgres://fly/hoby"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.expose_secret(),
            "postgres://primary/hoby"
        );
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "HOBY_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("HOBY_DATABASE_URL", "postgres://localhost/hoby"),
            ("HOBY_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "HOBY_PORT"));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let err = load(&[
            ("HOBY_DATABASE_URL", "postgres://localhost/hoby"),
            ("NOTIFICATION_QUEUE_CAPACITY", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOBY_DATABASE_URL", "postgres://localhost/hoby"),
            ("HOBY_HOST", "0.0.0.0"),
            ("HOBY_PORT", "3000"),
            ("LOG_FORMAT", "JSON"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("HOBY_DATABASE_URL", "postgres://user:hunter2@db/hoby")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
