//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::time::Duration;
use tourney::db::{DatabaseConfig, DatabaseConfigError};

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default per-request storage deadline in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Longest accepted request deadline in milliseconds
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Where tournaments are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through a connection pool
    Postgres(DatabaseConfig),
    /// Process-local store, lost on exit
    Memory,
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Postgres(_) => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub backend: StorageBackend,
    /// Deadline applied to every storage call of a request
    pub request_timeout: Duration,
}

/// Values given on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `SERVER_BIND`, `TOURNEY_STORAGE` (`postgres` or `memory`),
    /// `REQUEST_TIMEOUT_MS` and, for postgres, the `DATABASE_URL` / `DB_*`
    /// pool settings.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] against an arbitrary key lookup
    pub fn from_lookup<F>(overrides: Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => {
                let raw = lookup("SERVER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not an IP:PORT address"),
                })?
            }
        };

        let storage = if overrides.memory {
            "memory".to_string()
        } else {
            lookup("TOURNEY_STORAGE").unwrap_or_else(|| "postgres".to_string())
        };

        let backend = match storage.to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "postgres" => {
                let database_url = overrides.database_url.clone();
                let database = DatabaseConfig::from_lookup(|key| {
                    if key == "DATABASE_URL" && database_url.is_some() {
                        database_url.clone()
                    } else {
                        lookup(key)
                    }
                })?;
                StorageBackend::Postgres(database)
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "TOURNEY_STORAGE".to_string(),
                    reason: format!("unknown backend '{other}', expected postgres or memory"),
                });
            }
        };

        let timeout_ms = match lookup("REQUEST_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_MS".to_string(),
                reason: format!("'{raw}' is not a number of milliseconds"),
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        Ok(ServerConfig {
            bind,
            backend,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout_ms = self.request_timeout.as_millis();
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if timeout_ms > u128::from(MAX_REQUEST_TIMEOUT_MS) {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_MS".to_string(),
                reason: format!("Must be at most {MAX_REQUEST_TIMEOUT_MS}"),
            });
        }

        if let StorageBackend::Postgres(database) = &self.backend {
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl From<DatabaseConfigError> for ConfigError {
    fn from(err: DatabaseConfigError) -> Self {
        match err {
            DatabaseConfigError::Missing(var) => ConfigError::MissingRequired {
                var: var.to_string(),
                hint: "Set it, or run with --memory / TOURNEY_STORAGE=memory".to_string(),
            },
            DatabaseConfigError::Invalid { var, value } => ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("'{value}' is not valid"),
            },
        }
    }
}
