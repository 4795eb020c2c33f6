//! Storage capabilities the ledger runs on.
//!
//! Each entity has its own trait. An [`AtomicUnit`] is one open atomic unit
//! of work: writes made through it become visible only on
//! [`AtomicUnit::commit`], and dropping it uncommitted discards them.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Coins, Item, LedgerResult, Order, Transaction, User, Wallet};

mod memory;
mod sql;

pub use memory::{MemoryStore, MemoryUnit};
pub use sql::{SqlStore, SqlUnit};

pub trait WalletStore {
    fn wallet(&self, id: Uuid) -> impl Future<Output = LedgerResult<Wallet>> + Send;

    fn wallet_by_owner(&self, user_id: Uuid) -> impl Future<Output = LedgerResult<Wallet>> + Send;

    /// Fails with `DuplicateOwner` if the user already has a wallet.
    fn create_wallet(
        &self,
        user_id: Uuid,
        initial_balance: Coins,
    ) -> impl Future<Output = LedgerResult<Wallet>> + Send;

    /// Decrease the balance only if it stays `>= 0`.
    ///
    /// On `InsufficientFunds` or `NotFound` the wallet is left untouched.
    fn debit_if_sufficient(
        &self,
        id: Uuid,
        amount: Coins,
    ) -> impl Future<Output = LedgerResult<DateTime<Utc>>> + Send;

    fn credit(
        &self,
        id: Uuid,
        amount: Coins,
    ) -> impl Future<Output = LedgerResult<DateTime<Utc>>> + Send;
}

/// Transfer records. Listings are in insertion order and return `NotFound`
/// when empty.
pub trait TransactionStore {
    fn append_transaction(
        &self,
        sender: Uuid,
        receiver: Uuid,
        amount: Coins,
    ) -> impl Future<Output = LedgerResult<Transaction>> + Send;

    fn transactions_by_sender(
        &self,
        wallet_id: Uuid,
    ) -> impl Future<Output = LedgerResult<Vec<Transaction>>> + Send;

    fn transactions_by_receiver(
        &self,
        wallet_id: Uuid,
    ) -> impl Future<Output = LedgerResult<Vec<Transaction>>> + Send;
}

/// Purchase records. Same listing contract as [`TransactionStore`].
pub trait OrderStore {
    fn append_order(
        &self,
        wallet_id: Uuid,
        item_id: Uuid,
        cost: Coins,
    ) -> impl Future<Output = LedgerResult<Order>> + Send;

    fn orders_by_wallet(
        &self,
        wallet_id: Uuid,
    ) -> impl Future<Output = LedgerResult<Vec<Order>>> + Send;
}

pub trait UserStore {
    /// Fails with `DuplicateUsername` if the name is taken.
    fn insert_user(&self, user: &User) -> impl Future<Output = LedgerResult<User>> + Send;

    fn user(&self, id: Uuid) -> impl Future<Output = LedgerResult<User>> + Send;

    fn user_by_username(&self, username: &str)
    -> impl Future<Output = LedgerResult<User>> + Send;
}

pub trait CatalogStore {
    fn item(&self, id: Uuid) -> impl Future<Output = LedgerResult<Item>> + Send;

    fn item_by_name(&self, name: &str) -> impl Future<Output = LedgerResult<Item>> + Send;
}

pub trait AtomicUnit: WalletStore + TransactionStore + OrderStore + UserStore + Send + Sync {
    fn commit(self) -> impl Future<Output = LedgerResult<()>> + Send;
}

/// Everything the ledger needs from a backend.
pub trait LedgerStore:
    WalletStore + TransactionStore + OrderStore + UserStore + CatalogStore + Send + Sync
{
    type Unit: AtomicUnit;

    fn begin(&self) -> impl Future<Output = LedgerResult<Self::Unit>> + Send;
}
