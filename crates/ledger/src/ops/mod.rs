use std::time::Duration;

use tracing::{error, warn};

use crate::{Coins, LedgerError, LedgerResult, LedgerStore, SqlStore};

mod accounts;
mod history;
mod purchase;
mod transfer;

pub use history::{History, InventoryItem, ReceivedTransfer, SentTransfer};

/// Run a block inside one atomic unit of the store, committing on success.
///
/// An early return (`?`) drops the unit, which rolls it back. So does running
/// past the ledger's unit timeout, which surfaces as a storage error.
macro_rules! with_unit {
    ($self:expr, |$unit:ident| $body:expr) => {{
        let limit = $self.unit_timeout;
        let outcome = tokio::time::timeout(limit, async {
            let $unit = $self.store.begin().await?;
            let value: $crate::LedgerResult<_> = $body;
            let value = value?;
            $unit.commit().await?;
            Ok::<_, $crate::LedgerError>(value)
        })
        .await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err($crate::LedgerError::Storage(format!(
                "atomic unit did not finish within {limit:?}"
            ))),
        }
    }};
}

pub(crate) use with_unit;

/// The ledger engine.
///
/// Generic over the backend so the same operations run on
/// [`SqlStore`] in production and on [`MemoryStore`](crate::MemoryStore) in tests.
#[derive(Debug)]
pub struct Ledger<S = SqlStore> {
    store: S,
    starting_balance: Coins,
    unit_timeout: Duration,
}

/// Upper bound on one atomic unit, from begin to commit.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(3);

impl<S: LedgerStore> Ledger<S> {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder<S> {
        LedgerBuilder {
            store: None,
            starting_balance: Coins::ZERO,
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn starting_balance(&self) -> Coins {
        self.starting_balance
    }

    pub fn unit_timeout(&self) -> Duration {
        self.unit_timeout
    }
}

/// Log a failed write at the level its kind deserves.
fn log_failure(operation: &str, err: &LedgerError) {
    match err {
        LedgerError::InsufficientFunds(wallet) => {
            warn!(operation, %wallet, "debit rejected: insufficient funds");
        }
        err if err.is_storage() => error!(operation, error = %err, "storage failure"),
        err => warn!(operation, error = %err, "operation rejected"),
    }
}

/// The builder for `Ledger`
pub struct LedgerBuilder<S> {
    store: Option<S>,
    starting_balance: Coins,
    unit_timeout: Duration,
}

impl<S: LedgerStore> LedgerBuilder<S> {
    /// Pass the required store
    pub fn store(mut self, store: S) -> LedgerBuilder<S> {
        self.store = Some(store);
        self
    }

    /// Balance credited to every newly registered wallet.
    pub fn starting_balance(mut self, balance: Coins) -> LedgerBuilder<S> {
        self.starting_balance = balance;
        self
    }

    /// How long an atomic unit may run before it is rolled back.
    pub fn unit_timeout(mut self, limit: Duration) -> LedgerBuilder<S> {
        self.unit_timeout = limit;
        self
    }

    /// Construct `Ledger`
    pub fn build(self) -> LedgerResult<Ledger<S>> {
        let store = self
            .store
            .ok_or_else(|| LedgerError::Storage("ledger store not configured".to_string()))?;
        if self.starting_balance.is_negative() {
            return Err(LedgerError::InvalidAmount(
                "starting balance must not be negative".to_string(),
            ));
        }
        if self.unit_timeout.is_zero() {
            return Err(LedgerError::InvalidInput(
                "unit timeout must be positive".to_string(),
            ));
        }
        Ok(Ledger {
            store,
            starting_balance: self.starting_balance,
            unit_timeout: self.unit_timeout,
        })
    }
}
