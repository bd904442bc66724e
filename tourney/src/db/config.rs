//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading database settings from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

fn parse_or<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, DatabaseConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| DatabaseConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    pub fn from_env() -> Result<Self, DatabaseConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] against an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DatabaseConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::development();
        let database_url =
            lookup("DATABASE_URL").ok_or(DatabaseConfigError::Missing("DATABASE_URL"))?;

        let config = Self {
            database_url,
            max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                lookup("DB_MAX_CONNECTIONS"),
                defaults.max_connections,
            )?,
            min_connections: parse_or(
                "DB_MIN_CONNECTIONS",
                lookup("DB_MIN_CONNECTIONS"),
                defaults.min_connections,
            )?,
            connection_timeout_secs: parse_or(
                "DB_CONNECTION_TIMEOUT",
                lookup("DB_CONNECTION_TIMEOUT"),
                defaults.connection_timeout_secs,
            )?,
            idle_timeout_secs: parse_or(
                "DB_IDLE_TIMEOUT",
                lookup("DB_IDLE_TIMEOUT"),
                defaults.idle_timeout_secs,
            )?,
            max_lifetime_secs: parse_or(
                "DB_MAX_LIFETIME",
                lookup("DB_MAX_LIFETIME"),
                defaults.max_lifetime_secs,
            )?,
        };

        if config.min_connections > config.max_connections {
            return Err(DatabaseConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS",
                value: config.min_connections.to_string(),
            });
        }

        Ok(config)
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/tourney` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/tourney".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
