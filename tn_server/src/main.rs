//! Tournament management REST server.
//!
//! Serves the `tourney` managers over HTTP, backed by PostgreSQL or, for
//! local runs, an in-memory store seeded with demo users.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::{error, info, warn};
use pico_args::Arguments;
use tn_server::{
    api::{self, AppState},
    config::{Overrides, ServerConfig, StorageBackend},
    logging,
};
use tourney::{
    bracket::RandomSeeder,
    db::{Database, InMemoryStore},
    users::{Role, User},
};

const HELP: &str = "\
Run the tournament management server

USAGE:
  tn_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Use the in-memory store with demo users instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  TOURNEY_STORAGE          Storage backend: postgres | memory
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size upper bound
  REQUEST_TIMEOUT_MS       Deadline for each storage call of a request
  RUST_LOG                 Log filter (default: info,sqlx=warn,hyper=warn)
";

/// Demo accounts created for the in-memory backend
const DEMO_ADMIN: i64 = 1;
const DEMO_ORGANIZER: i64 = 2;
const DEMO_PLAYERS: std::ops::RangeInclusive<i64> = 100..=115;

fn demo_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new()
        .with_user(User::new(DEMO_ADMIN, "admin", Role::Admin))
        .with_user(User::new(DEMO_ORGANIZER, "organizer", Role::Organizer));
    for id in DEMO_PLAYERS {
        store.insert_user(User::new(id, format!("player{id}"), Role::Player));
    }
    Arc::new(store)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs
            .opt_value_from_str::<_, SocketAddr>("--bind")
            .context("--bind must be an IP:PORT address")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}\n\n{HELP}");
    }

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    info!(
        "Starting tournament server at {} with {} storage",
        config.bind,
        config.backend.name()
    );

    let state = match &config.backend {
        StorageBackend::Postgres(db_config) => {
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected and migrated");

            AppState::from_store(
                Arc::new(db.store()),
                RandomSeeder::new(),
                config.request_timeout,
            )
            .with_database(db)
        }
        StorageBackend::Memory => {
            warn!("In-memory storage: all data is lost on exit");
            info!(
                "Demo users: admin={DEMO_ADMIN}, organizer={DEMO_ORGANIZER}, players={}..={}",
                DEMO_PLAYERS.start(),
                DEMO_PLAYERS.end()
            );
            AppState::from_store(demo_store(), RandomSeeder::new(), config.request_timeout)
        }
    };

    // Resolve starts interrupted by a previous crash before serving requests
    match state
        .tournaments
        .recover_pending_brackets(&state.context())
        .await
    {
        Ok(report) if report.confirmed.is_empty() && report.reverted.is_empty() => {}
        Ok(report) => info!(
            "Recovered interrupted starts: {} confirmed, {} reverted to open",
            report.confirmed.len(),
            report.reverted.len()
        ),
        Err(e) => error!("Bracket recovery failed, will retry on next start: {e}"),
    }

    let database = state.database.clone();
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {e}");
        std::future::pending::<()>().await;
    }
}
