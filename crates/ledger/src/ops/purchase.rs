use tracing::info;
use uuid::Uuid;

use super::{Ledger, log_failure, with_unit};
use crate::{AtomicUnit, Coins, LedgerResult, LedgerStore, Order, OrderStore, WalletStore};

impl<S: LedgerStore> Ledger<S> {
    /// Debit `cost` from the wallet and record an order for `item_id`.
    ///
    /// `cost` is taken as given; the item is not re-priced here.
    pub async fn purchase(&self, wallet_id: Uuid, item_id: Uuid, cost: Coins) -> LedgerResult<Order> {
        let cost = cost.ensure_transferable()?;

        match self.run_purchase(wallet_id, item_id, cost).await {
            Ok(order) => {
                info!(
                    order_id = order.id,
                    wallet = %wallet_id,
                    item = %item_id,
                    cost = cost.amount(),
                    "purchase committed"
                );
                Ok(order)
            }
            Err(err) => {
                log_failure("purchase", &err);
                Err(err)
            }
        }
    }

    async fn run_purchase(&self, wallet_id: Uuid, item_id: Uuid, cost: Coins) -> LedgerResult<Order> {
        with_unit!(self, |unit| {
            let order = unit.append_order(wallet_id, item_id, cost).await?;
            unit.debit_if_sufficient(wallet_id, cost).await?;
            Ok(order)
        })
    }
}
