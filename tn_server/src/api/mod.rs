//! HTTP API for the tournament server.
//!
//! A thin JSON transport over the `tourney` managers. Handlers translate
//! paths and bodies into manager calls and map [`tourney::TournamentError`]
//! kinds onto HTTP statuses; no tournament rule lives here.
//!
//! # Endpoints
//!
//! ```text
//! GET    /health
//! POST   /api/v1/tournaments                                    (identity)
//! GET    /api/v1/tournaments/{id}
//! POST   /api/v1/tournaments/{id}/open|start|complete|cancel    (identity)
//! POST   /api/v1/tournaments/{id}/registrations                 (identity)
//! DELETE /api/v1/tournaments/{id}/registrations/{player_id}     (identity)
//! GET    /api/v1/tournaments/{id}/participants?offset&limit
//! GET    /api/v1/tournaments/{id}/participants/count
//! GET    /api/v1/tournaments/{id}/matches
//! POST   /api/v1/matches/{id}/result                            (identity)
//! POST   /api/v1/matches/{id}/schedule                          (identity)
//! GET    /api/v1/tournaments/{id}/statistics
//! POST   /api/v1/tournaments/{id}/statistics/recompute          (identity)
//! GET    /api/v1/tournaments/{id}/statistics/{player_id}
//! POST   /api/v1/tournaments/{id}/statistics/{player_id}/recompute (identity)
//! POST   /api/v1/admin/recover                                  (identity, admin)
//! ```
//!
//! Routes marked *identity* require an `X-User-Id` header; see [`identity`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tn_server::api::{AppState, create_router};
//! use tourney::bracket::RandomSeeder;
//! use tourney::db::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::from_store(
//!     InMemoryStore::shared(),
//!     RandomSeeder::new(),
//!     Duration::from_secs(5),
//! );
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod admin;
pub mod errors;
pub mod identity;
pub mod matches;
pub mod registrations;
pub mod request_id;
pub mod stats;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::Instrument;

use tourney::bracket::{BracketGenerator, Seeder};
use tourney::db::{
    Database, MatchRepository, RequestContext, StatisticRepository, StoreError,
    TournamentRepository, UserRepository,
};
use tourney::tournament::TournamentId;
use tourney::users::UserId;
use tourney::{
    MatchManager, RegistrationManager, StatsManager, TournamentError, TournamentManager,
    TournamentResult,
};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub tournaments: Arc<TournamentManager>,
    pub registry: Arc<RegistrationManager>,
    pub matches: Arc<MatchManager>,
    pub stats: Arc<StatsManager>,
    /// Postgres pool, absent on the in-memory backend
    pub database: Option<Database>,
    /// Deadline applied to every storage call of a request
    pub request_timeout: Duration,
}

impl AppState {
    /// Build the managers over one store implementing every repository
    pub fn from_store<S>(store: Arc<S>, seeder: impl Seeder + 'static, request_timeout: Duration) -> Self
    where
        S: TournamentRepository + MatchRepository + UserRepository + StatisticRepository + 'static,
    {
        let tournaments: Arc<dyn TournamentRepository> = store.clone();
        let matches: Arc<dyn MatchRepository> = store.clone();
        let users: Arc<dyn UserRepository> = store.clone();
        let statistics: Arc<dyn StatisticRepository> = store;

        let generator = BracketGenerator::with_seeder(tournaments.clone(), matches.clone(), seeder);

        Self {
            tournaments: Arc::new(TournamentManager::with_generator(
                tournaments.clone(),
                matches.clone(),
                users.clone(),
                generator,
            )),
            registry: Arc::new(RegistrationManager::new(tournaments.clone(), users.clone())),
            matches: Arc::new(MatchManager::new(tournaments.clone(), matches.clone())),
            stats: Arc::new(StatsManager::new(tournaments, matches, users, statistics)),
            database: None,
            request_timeout,
        }
    }

    /// Attach the pool used for health checks
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Fresh context for one request
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.request_timeout)
    }

    /// Fail with PermissionDenied unless `caller` created the tournament or is an admin
    pub(crate) async fn ensure_organizer(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        caller: UserId,
    ) -> TournamentResult<()> {
        let tournament = self.tournaments.get_tournament(ctx, tournament_id).await?;
        if !tournament.is_created_by(caller) {
            self.tournaments.require_admin(ctx, caller).await?;
        }
        Ok(())
    }
}

/// Run a manager call on its own task, tied to the request's lifetime
///
/// If the client goes away the handler future is dropped, the guard fires and
/// the context's token is cancelled. The task itself keeps running, so a
/// started transition still gets to compensate under its detached context.
/// The task stays inside the request span.
pub(crate) async fn run_cancellable<T, F, Fut>(ctx: RequestContext, op: F) -> TournamentResult<T>
where
    F: FnOnce(RequestContext) -> Fut,
    Fut: Future<Output = TournamentResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let guard = ctx.cancellation_token().clone().drop_guard();
    let joined = tokio::spawn(op(ctx).in_current_span()).await;
    guard.disarm();

    joined.map_err(|e| {
        TournamentError::Persistence(StoreError::Unavailable(format!("request task failed: {e}")))
    })?
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route("/tournaments/{id}/matches", get(tournaments::list_matches))
        .route(
            "/tournaments/{id}/participants",
            get(registrations::list_participants),
        )
        .route(
            "/tournaments/{id}/participants/count",
            get(registrations::count_participants),
        )
        .route("/tournaments/{id}/statistics", get(stats::list_statistics))
        .route(
            "/tournaments/{id}/statistics/{player_id}",
            get(stats::get_statistic),
        );

    let protected_routes = Router::new()
        .route("/tournaments", post(tournaments::create_tournament))
        .route("/tournaments/{id}/open", post(tournaments::open_tournament))
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route(
            "/tournaments/{id}/complete",
            post(tournaments::complete_tournament),
        )
        .route("/tournaments/{id}/cancel", post(tournaments::cancel_tournament))
        .route(
            "/tournaments/{id}/registrations",
            post(registrations::register),
        )
        .route(
            "/tournaments/{id}/registrations/{player_id}",
            delete(registrations::unregister),
        )
        .route("/matches/{id}/result", post(matches::record_result))
        .route("/matches/{id}/schedule", post(matches::schedule_match))
        .route(
            "/tournaments/{id}/statistics/recompute",
            post(stats::recompute_tournament),
        )
        .route(
            "/tournaments/{id}/statistics/{player_id}/recompute",
            post(stats::recompute_player),
        )
        .route("/admin/recover", post(admin::recover))
        .layer(axum::middleware::from_fn(identity::identity_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the storage backend answers, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":"postgres","database":true,"version":"0.1.0",...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
