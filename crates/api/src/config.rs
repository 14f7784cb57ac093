use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use advocacy_core::search::DEFAULT_LIMIT_PER_COLLECTION;
use advocacy_core::service::{ServiceSettings, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL. Without one, documents are kept in memory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    /// Directory holding uploaded media.
    pub media_root: PathBuf,
    /// Public URL prefix under which media is served.
    pub media_base_url: String,
    /// Secret used to verify session tokens issued by the auth provider.
    pub jwt_secret: String,
    /// Largest accepted single upload, in bytes.
    pub max_upload_bytes: usize,
    pub search_limit_per_collection: usize,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

fn var_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = var_or("HOST", "0.0.0.0");
        let port = parse_var("PORT", 3030u16)?;
        let media_base_url =
            env::var("MEDIA_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}/media"));

        Ok(Self {
            host,
            port,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 20)?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", 5)?,
            media_root: PathBuf::from(var_or("MEDIA_ROOT", "./media")),
            media_base_url,
            jwt_secret: var_or("JWT_SECRET", "dev-secret-change-me-in-production"),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            search_limit_per_collection: parse_var(
                "SEARCH_LIMIT_PER_COLLECTION",
                DEFAULT_LIMIT_PER_COLLECTION,
            )?,
            event_bus_capacity: parse_var("EVENT_BUS_CAPACITY", 1024)?,
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            max_upload_bytes: self.max_upload_bytes,
            search_limit_per_collection: self.search_limit_per_collection,
        }
    }

    /// Cap on a whole multipart request: every slot filled plus the form.
    pub fn max_request_bytes(&self) -> usize {
        self.max_upload_bytes.saturating_mul(4).saturating_add(1024 * 1024)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            db_max_connections: 1,
            db_min_connections: 1,
            media_root: PathBuf::from("./media"),
            media_base_url: "https://cdn.test".into(),
            jwt_secret: "test-secret".into(),
            max_upload_bytes: 1024,
            search_limit_per_collection: 50,
            event_bus_capacity: 16,
            log_level: "debug".into(),
        }
    }
}
