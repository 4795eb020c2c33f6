//! Coin transfer endpoint

use api_types::coins::SendCoinRequest;
use axum::{Extension, Json, extract::State, extract::rejection::JsonRejection};
use ledger::Coins;

use crate::{ServerError, server::AuthUser, server::ServerState};

pub async fn send_coin(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<SendCoinRequest>, JsonRejection>,
) -> Result<(), ServerError> {
    let Json(payload) = payload?;
    state
        .ledger
        .send_coin(user.id, &payload.to_user, Coins::new(payload.amount))
        .await?;
    Ok(())
}
