use std::str::FromStr;

use thiserror::Error;

use crate::auth::AuthSettings;

const DEFAULT_AUDIENCE: &str = "authenticated";
const DEFAULT_LOG_FILTER: &str = "finance_tracker_api=info";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub log_filter: String,
}

impl AppConfig {
    /// Reads the process environment, loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let storage = match read("STORAGE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                value,
            })?,
            None => StorageBackend::Postgres,
        };

        let database_url = read("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let max_connections = match read("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    name: "DATABASE_MAX_CONNECTIONS",
                    value,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let jwt_secret = read("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(AppConfig {
            storage,
            database_url,
            max_connections,
            jwt_secret,
            jwt_audience: read("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            log_filter: read("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    /// In-memory configuration for demos and tests.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        AppConfig {
            storage: StorageBackend::Memory,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            jwt_secret: jwt_secret.into(),
            jwt_audience: DEFAULT_AUDIENCE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings::new(&self.jwt_secret, &self.jwt_audience)
    }
}
