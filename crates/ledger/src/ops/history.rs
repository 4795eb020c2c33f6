//! Read-only reconstruction of a wallet's coin history.

use std::collections::HashMap;

use uuid::Uuid;

use super::Ledger;
use crate::{
    CatalogStore, Coins, LedgerError, LedgerResult, LedgerStore, OrderStore, TransactionStore,
    UserStore, WalletStore,
};

/// Items bought from one wallet, grouped by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedTransfer {
    pub from_user: String,
    pub amount: Coins,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransfer {
    pub to_user: String,
    pub amount: Coins,
}

/// Snapshot of one wallet: balance, inventory and transfers in both directions.
///
/// Inventory is in first-purchase order; transfers are in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    coins: Coins,
    inventory: Vec<InventoryItem>,
    received: Vec<ReceivedTransfer>,
    sent: Vec<SentTransfer>,
}

impl History {
    pub fn coins(&self) -> Coins {
        self.coins
    }

    pub fn inventory(&self) -> impl Iterator<Item = &InventoryItem> {
        self.inventory.iter()
    }

    pub fn received(&self) -> impl Iterator<Item = &ReceivedTransfer> {
        self.received.iter()
    }

    pub fn sent(&self) -> impl Iterator<Item = &SentTransfer> {
        self.sent.iter()
    }
}

/// An empty listing is not an error for a history.
fn or_empty<T>(listing: LedgerResult<Vec<T>>) -> LedgerResult<Vec<T>> {
    match listing {
        Err(LedgerError::NotFound(_)) => Ok(Vec::new()),
        other => other,
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub async fn history(&self, wallet_id: Uuid) -> LedgerResult<History> {
        let wallet = self.store.wallet(wallet_id).await?;
        let orders = or_empty(self.store.orders_by_wallet(wallet_id).await)?;
        let received = or_empty(self.store.transactions_by_receiver(wallet_id).await)?;
        let sent = or_empty(self.store.transactions_by_sender(wallet_id).await)?;

        let mut inventory: Vec<InventoryItem> = Vec::new();
        let mut slots: HashMap<Uuid, usize> = HashMap::new();
        for order in orders {
            if let Some(&slot) = slots.get(&order.item_id) {
                inventory[slot].quantity += 1;
                continue;
            }
            let item = self.store.item(order.item_id).await?;
            slots.insert(order.item_id, inventory.len());
            inventory.push(InventoryItem {
                name: item.name,
                quantity: 1,
            });
        }

        let mut names = HashMap::new();
        let mut history = History {
            coins: wallet.balance,
            inventory,
            received: Vec::with_capacity(received.len()),
            sent: Vec::with_capacity(sent.len()),
        };
        for record in received {
            history.received.push(ReceivedTransfer {
                from_user: self
                    .owner_name(record.sender_wallet_id, &mut names)
                    .await?,
                amount: record.amount,
            });
        }
        for record in sent {
            history.sent.push(SentTransfer {
                to_user: self
                    .owner_name(record.receiver_wallet_id, &mut names)
                    .await?,
                amount: record.amount,
            });
        }
        Ok(history)
    }

    /// Username owning `wallet_id`, memoized in `cache`.
    async fn owner_name(
        &self,
        wallet_id: Uuid,
        cache: &mut HashMap<Uuid, String>,
    ) -> LedgerResult<String> {
        if let Some(name) = cache.get(&wallet_id) {
            return Ok(name.clone());
        }
        let wallet = self.store.wallet(wallet_id).await?;
        let user = self.store.user(wallet.user_id).await?;
        cache.insert(wallet_id, user.username.clone());
        Ok(user.username)
    }
}
