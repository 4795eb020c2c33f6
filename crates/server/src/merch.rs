use axum::{
    Extension,
    extract::{Path, State},
};

use crate::{ServerError, server::AuthUser, server::ServerState};

/// Buy one item from the catalog at its list price.
pub async fn buy(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(item): Path<String>,
) -> Result<(), ServerError> {
    state.ledger.buy_item(user.id, &item).await?;
    Ok(())
}
