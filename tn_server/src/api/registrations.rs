//! Participant registration handlers.
//!
//! Players register themselves by default. Registering or withdrawing
//! someone else requires the tournament's creator or an admin.

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tourney::db::Page;
use tourney::tournament::{Registration, TournamentId};
use tourney::users::UserId;

use super::errors::{ApiError, ApiResult, bad_request, error_response};
use super::{AppState, run_cancellable};

/// Optional body of `POST /tournaments/{id}/registrations`
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Player to register; defaults to the caller
    #[serde(default)]
    pub player_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantCount {
    pub tournament_id: TournamentId,
    pub count: u32,
}

fn parse_register_body(body: &[u8]) -> Result<RegisterRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegisterRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| bad_request(format!("Invalid request body: {e}")))
}

/// Register the caller, or `player_id` from the body, for a tournament.
///
/// # Errors
///
/// - `403 Forbidden`: Player cannot compete, or caller may not register others
/// - `404 Not Found`: Tournament or player does not exist
/// - `409 Conflict`: Already registered, tournament not OPEN, or full
/// - `410 Gone`: Registration deadline has passed
pub async fn register(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<TournamentId>,
    body: Bytes,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let request = parse_register_body(&body)?;
    let player_id = request.player_id.unwrap_or(user_id);

    let ctx = state.context();
    if player_id != user_id {
        state
            .ensure_organizer(&ctx, id, user_id)
            .await
            .map_err(error_response)?;
    }

    let registry = state.registry.clone();
    run_cancellable(ctx, move |ctx| async move {
        registry.register(&ctx, id, player_id).await
    })
    .await
    .map(|r| (StatusCode::CREATED, Json(r)))
    .map_err(error_response)
}

/// Withdraw a registration while the tournament is OPEN.
pub async fn unregister(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path((id, player_id)): Path<(TournamentId, UserId)>,
) -> Result<StatusCode, ApiError> {
    let ctx = state.context();
    if player_id != user_id {
        state
            .ensure_organizer(&ctx, id, user_id)
            .await
            .map_err(error_response)?;
    }

    let registry = state.registry.clone();
    run_cancellable(ctx, move |ctx| async move {
        registry.unregister(&ctx, id, player_id).await
    })
    .await
    .map(|()| StatusCode::NO_CONTENT)
    .map_err(error_response)
}

/// One page of participants in registration order; `limit` is clamped to 1..=100.
pub async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    Query(page): Query<Page>,
) -> ApiResult<Vec<Registration>> {
    let ctx = state.context();
    state
        .registry
        .list_participants(&ctx, id, page)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn count_participants(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<ParticipantCount> {
    let ctx = state.context();
    state
        .registry
        .count_participants(&ctx, id)
        .await
        .map(|count| {
            Json(ParticipantCount {
                tournament_id: id,
                count,
            })
        })
        .map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_registers_caller() {
        assert_eq!(parse_register_body(b"").unwrap().player_id, None);
        assert_eq!(parse_register_body(b"  \n").unwrap().player_id, None);
        assert_eq!(parse_register_body(b"{}").unwrap().player_id, None);
    }

    #[test]
    fn test_body_names_player() {
        let request = parse_register_body(br#"{"player_id": 105}"#).unwrap();
        assert_eq!(request.player_id, Some(105));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let (status, _) = parse_register_body(b"{not json").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
