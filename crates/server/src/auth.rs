//! Sign-in endpoint

use api_types::auth::{AuthRequest, AuthResponse};
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};

use crate::{ServerError, server::ServerState};

/// Sign in (registering on first use) and hand out a bearer token.
pub async fn authenticate(
    State(state): State<ServerState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    let Json(payload) = payload?;
    let user = state
        .ledger
        .authenticate(&payload.username, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: state.tokens.issue(user.id)?,
        }),
    ))
}
