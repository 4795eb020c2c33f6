//! Wallet summary endpoint

use api_types::info::{CoinHistory, InfoResponse, InventoryEntry, Received, Sent};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::AuthUser, server::ServerState};

pub async fn info(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<InfoResponse>, ServerError> {
    let history = state.ledger.info(user.id).await?;

    Ok(Json(InfoResponse {
        coins: history.coins().amount(),
        inventory: history
            .inventory()
            .map(|item| InventoryEntry {
                kind: item.name.clone(),
                quantity: item.quantity,
            })
            .collect(),
        coin_history: CoinHistory {
            received: history
                .received()
                .map(|r| Received {
                    from_user: r.from_user.clone(),
                    amount: r.amount.amount(),
                })
                .collect(),
            sent: history
                .sent()
                .map(|s| Sent {
                    to_user: s.to_user.clone(),
                    amount: s.amount.amount(),
                })
                .collect(),
        },
    }))
}
