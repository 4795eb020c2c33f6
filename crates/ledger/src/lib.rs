//! Transactional coin ledger for the shop.
//!
//! Wallet balances only change through [`Ledger::transfer`] and
//! [`Ledger::purchase`]. Each runs inside one atomic unit of the underlying
//! [`LedgerStore`]: the record is written, the debit is applied only if the
//! balance stays non-negative, and everything commits together or not at all.

use uuid::Uuid;

pub use coins::Coins;
pub use error::LedgerError;
pub use merch::Item;
pub use ops::{
    DEFAULT_UNIT_TIMEOUT, History, InventoryItem, Ledger, LedgerBuilder, ReceivedTransfer,
    SentTransfer,
};
pub use orders::Order;
pub use store::{
    AtomicUnit, CatalogStore, LedgerStore, MemoryStore, MemoryUnit, OrderStore, SqlStore,
    SqlUnit, TransactionStore, UserStore, WalletStore,
};
pub use transactions::Transaction;
pub use users::User;
pub use wallets::Wallet;

pub mod credentials;

mod coins;
mod error;
mod merch;
mod ops;
mod orders;
mod store;
mod transactions;
mod users;
mod wallets;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Parse a stored identifier. A malformed id means the row is corrupt.
fn parse_id(raw: &str, label: &str) -> LedgerResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| LedgerError::Storage(format!("invalid {label} id: {raw}")))
}
