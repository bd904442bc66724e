//! Tournament lifecycle handlers.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "X-User-Id: 2" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Open", "max_participants": 16}'
//! ```
//!
//! Start it once enough players registered:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/start -H "X-User-Id: 2"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tourney::matches::Match;
use tourney::tournament::{
    NewTournament, StartOutcome, Tournament, TournamentFormat, TournamentId,
};
use tourney::users::UserId;

use super::errors::{ApiError, ApiResult, error_response};
use super::{AppState, run_cancellable};

/// Body of `POST /tournaments`; the caller becomes the creator
#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    #[serde(default)]
    pub format: Option<TournamentFormat>,
    #[serde(default)]
    pub min_participants: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub registration_deadline: Option<DateTime<Utc>>,
}

impl CreateTournamentRequest {
    fn into_new_tournament(self, creator_id: UserId) -> NewTournament {
        NewTournament {
            name: self.name,
            format: self.format.unwrap_or(TournamentFormat::SingleElimination),
            min_participants: self.min_participants,
            max_participants: self.max_participants,
            registration_deadline: self.registration_deadline,
            creator_id,
        }
    }
}

/// Create a tournament in DRAFT.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid name or capacity bounds
/// - `403 Forbidden`: Caller account is inactive
/// - `404 Not Found`: Caller does not exist
pub async fn create_tournament(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let ctx = state.context();
    let new = request.into_new_tournament(user_id);

    state
        .tournaments
        .create_tournament(&ctx, new)
        .await
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(error_response)
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let ctx = state.context();
    state
        .tournaments
        .get_tournament(&ctx, id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DRAFT → OPEN
pub async fn open_tournament(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let manager = state.tournaments.clone();
    run_cancellable(state.context(), move |ctx| async move {
        manager.open_tournament(&ctx, id, user_id).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}

/// OPEN → ACTIVE with first-round bracket generation.
///
/// # Response
///
/// ```json
/// {
///   "tournament": { "id": 1, "status": "active", ... },
///   "bracket": { "rounds": 3, "matches_created": 3, "byes": 1, "auto_advanced": [107], ... },
///   "message": "Tournament 'Spring Open' started: ..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Tournament is not OPEN, or the bracket already exists
/// - `422 Unprocessable Entity`: Too few participants or unsupported format
/// - `500`/`503`: Storage failed; the tournament was reverted to OPEN or left
///   for recovery
pub async fn start_tournament(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<TournamentId>,
) -> ApiResult<StartOutcome> {
    let manager = state.tournaments.clone();
    run_cancellable(state.context(), move |ctx| async move {
        manager.start_tournament(&ctx, id, user_id).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}

/// ACTIVE → COMPLETED
pub async fn complete_tournament(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let manager = state.tournaments.clone();
    run_cancellable(state.context(), move |ctx| async move {
        manager.complete_tournament(&ctx, id, user_id).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}

/// DRAFT | OPEN | ACTIVE → CANCELLED
pub async fn cancel_tournament(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    let manager = state.tournaments.clone();
    run_cancellable(state.context(), move |ctx| async move {
        manager.cancel_tournament(&ctx, id, user_id).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn list_matches(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Vec<Match>> {
    let ctx = state.context();
    state
        .matches
        .list_matches(&ctx, id)
        .await
        .map(Json)
        .map_err(error_response)
}
