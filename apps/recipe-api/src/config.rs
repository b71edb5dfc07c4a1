//! Server configuration.

use std::{env, time::Duration};

use auth::{DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_JWT_ISSUER};

/// Secret used when no database is configured and none is supplied.
const DEVELOPMENT_JWT_SECRET: &str = "recipe-api-development-secret";

/// Longest accepted token lifetime (ten years).
pub const MAX_JWT_EXPIRATION_HOURS: u64 = 24 * 365 * 10;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub db_max_connections: u32,
    /// Delay between database readiness probes.
    pub db_wait_interval: Duration,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// JWT issuer.
    pub jwt_issuer: String,
    /// Whether to allow cross-origin requests.
    pub enable_cors: bool,
    /// Log level.
    pub log_level: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required when DATABASE_URL is set")]
    Missing { name: &'static str },

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            db_max_connections: 5,
            db_wait_interval: recipe_store::DEFAULT_WAIT_INTERVAL,
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            jwt_issuer: DEFAULT_JWT_ISSUER.to_string(),
            enable_cors: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = lookup("RECIPE_SERVER_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("RECIPE_SERVER_PORT") {
            config.port = parse("RECIPE_SERVER_PORT", port)?;
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());

        if let Some(max) = lookup("RECIPE_DB_MAX_CONNECTIONS") {
            config.db_max_connections = parse("RECIPE_DB_MAX_CONNECTIONS", max)?;
        }
        if let Some(ms) = lookup("RECIPE_DB_WAIT_INTERVAL_MS") {
            config.db_wait_interval =
                Duration::from_millis(parse("RECIPE_DB_WAIT_INTERVAL_MS", ms)?);
        }

        match lookup("RECIPE_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None if config.database_url.is_some() => {
                return Err(ConfigError::Missing {
                    name: "RECIPE_JWT_SECRET",
                });
            }
            None => {}
        }

        if let Some(hours) = lookup("RECIPE_JWT_EXPIRATION_HOURS") {
            let parsed = parse("RECIPE_JWT_EXPIRATION_HOURS", hours.clone())?;
            if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&parsed) {
                return Err(ConfigError::Invalid {
                    name: "RECIPE_JWT_EXPIRATION_HOURS",
                    value: hours,
                });
            }
            config.jwt_expiration_hours = parsed;
        }
        if let Some(issuer) = lookup("RECIPE_JWT_ISSUER") {
            config.jwt_issuer = issuer;
        }
        if let Some(cors) = lookup("RECIPE_ENABLE_CORS") {
            config.enable_cors = parse_bool("RECIPE_ENABLE_CORS", cors)?;
        }
        if let Some(level) = lookup("RECIPE_LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if the built-in development secret is in use.
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse();
    parsed.map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}
