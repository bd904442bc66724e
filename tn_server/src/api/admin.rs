//! Administrative handlers.

use axum::{
    Json,
    extract::{Extension, State},
};
use tourney::tournament::RecoveryReport;
use tourney::users::UserId;

use super::errors::{ApiResult, error_response};
use super::AppState;

/// Resolve tournaments left mid-start by an interrupted request.
///
/// The same pass runs at startup; this endpoint lets an admin rerun it.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an active admin
pub async fn recover(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<RecoveryReport> {
    let ctx = state.context();
    state
        .tournaments
        .require_admin(&ctx, user_id)
        .await
        .map_err(error_response)?;

    // Runs to completion even if the client disconnects
    state
        .tournaments
        .recover_pending_brackets(&ctx.detached())
        .await
        .map(Json)
        .map_err(error_response)
}
