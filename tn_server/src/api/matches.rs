//! Match result and scheduling handlers.
//!
//! Both operations are reserved to the tournament's creator and admins.
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/matches/3/result \
//!   -H "X-User-Id: 2" \
//!   -H "Content-Type: application/json" \
//!   -d '{"score": [{"first": 6, "second": 4}, {"first": 7, "second": 5}]}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tourney::matches::{Match, MatchId, Score};
use tourney::users::UserId;

use super::errors::{ApiResult, error_response};
use super::{AppState, run_cancellable};

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    /// Sets in play order
    pub score: Score,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMatchRequest {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Store the final score of a match.
///
/// # Errors
///
/// - `400 Bad Request`: Empty score
/// - `403 Forbidden`: Caller does not run the tournament
/// - `404 Not Found`: Match does not exist
/// - `409 Conflict`: Tournament not ACTIVE, or match already final
pub async fn record_result(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<MatchId>,
    Json(request): Json<RecordResultRequest>,
) -> ApiResult<Match> {
    let ctx = state.context();
    let m = state.matches.get_match(&ctx, id).await.map_err(error_response)?;
    state
        .ensure_organizer(&ctx, m.tournament_id, user_id)
        .await
        .map_err(error_response)?;

    let matches = state.matches.clone();
    run_cancellable(ctx, move |ctx| async move {
        matches.record_result(&ctx, id, request.score).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}

/// Set the date and optional location of a PENDING or SCHEDULED match.
pub async fn schedule_match(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<MatchId>,
    Json(request): Json<ScheduleMatchRequest>,
) -> ApiResult<Match> {
    let ctx = state.context();
    let m = state.matches.get_match(&ctx, id).await.map_err(error_response)?;
    state
        .ensure_organizer(&ctx, m.tournament_id, user_id)
        .await
        .map_err(error_response)?;

    let matches = state.matches.clone();
    run_cancellable(ctx, move |ctx| async move {
        matches
            .schedule_match(&ctx, id, request.scheduled_at, request.location)
            .await
    })
    .await
    .map(Json)
    .map_err(error_response)
}
