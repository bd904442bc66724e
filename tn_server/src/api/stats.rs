//! Statistics handlers.
//!
//! Statistics are materialized: reads return the last recomputed row, and the
//! recompute endpoints rebuild rows from completed matches.

use axum::{
    Json,
    extract::{Path, State},
};
use tourney::stats::Statistic;
use tourney::tournament::TournamentId;
use tourney::users::UserId;

use super::errors::{ApiResult, error_response, not_found};
use super::{AppState, run_cancellable};

pub async fn list_statistics(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Vec<Statistic>> {
    let ctx = state.context();
    state
        .stats
        .list_statistics(&ctx, id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Stored statistic of one player.
///
/// # Errors
///
/// - `404 Not Found`: Nothing has been computed for this player yet
pub async fn get_statistic(
    State(state): State<AppState>,
    Path((id, player_id)): Path<(TournamentId, UserId)>,
) -> ApiResult<Statistic> {
    let ctx = state.context();
    match state.stats.get_statistic(&ctx, player_id, id).await {
        Ok(Some(stat)) => Ok(Json(stat)),
        Ok(None) => Err(not_found(format!(
            "No statistics for player {player_id} in tournament {id}"
        ))),
        Err(e) => Err(error_response(e)),
    }
}

/// Rebuild every registered participant's statistic.
pub async fn recompute_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Vec<Statistic>> {
    let stats = state.stats.clone();
    run_cancellable(state.context(), move |ctx| async move {
        stats.recompute_tournament(&ctx, id).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn recompute_player(
    State(state): State<AppState>,
    Path((id, player_id)): Path<(TournamentId, UserId)>,
) -> ApiResult<Statistic> {
    let stats = state.stats.clone();
    run_cancellable(state.context(), move |ctx| async move {
        stats.recompute(&ctx, player_id, id).await
    })
    .await
    .map(Json)
    .map_err(error_response)
}
