//! Storage layer: repository traits, PostgreSQL and in-memory stores.
//!
//! The tournament core depends only on the traits in [`repository`]. Every
//! call made by a manager is wrapped in [`timeouts::guarded`] so that it
//! honours the request's deadline and cancellation token.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod errors;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::{DatabaseConfig, DatabaseConfigError};
pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use repository::{
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, MatchRepository, Page, RegistrationOutcome,
    StatisticRepository, TournamentRepository, UserRepository,
};
pub use timeouts::{RequestContext, guarded};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tourney::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Store implementing every repository trait over this pool
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
