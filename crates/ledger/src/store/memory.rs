//! In-process store used by tests.
//!
//! All state sits behind one async mutex. A [`MemoryUnit`] holds that mutex
//! for its whole lifetime and works on a staged copy, so units are fully
//! serialized and an uncommitted unit simply throws its copy away.
//!
//! Do not call the parent `MemoryStore` while a unit from it is open on the
//! same task: the unit owns the lock.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    AtomicUnit, CatalogStore, LedgerStore, OrderStore, TransactionStore, UserStore, WalletStore,
};
use crate::{Coins, Item, LedgerError, LedgerResult, Order, Transaction, User, Wallet};

#[derive(Clone, Debug, Default)]
struct State {
    users: Vec<User>,
    wallets: Vec<Wallet>,
    items: Vec<Item>,
    transactions: Vec<Transaction>,
    orders: Vec<Order>,
}

impl State {
    fn wallet(&self, id: Uuid) -> LedgerResult<Wallet> {
        self.wallets
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {id}")))
    }

    fn wallet_mut(&mut self, id: Uuid) -> LedgerResult<&mut Wallet> {
        self.wallets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {id}")))
    }

    fn wallet_by_owner(&self, user_id: Uuid) -> LedgerResult<Wallet> {
        self.wallets
            .iter()
            .find(|w| w.user_id == user_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("wallet of user {user_id}")))
    }

    fn create_wallet(&mut self, user_id: Uuid, initial_balance: Coins) -> LedgerResult<Wallet> {
        if initial_balance.is_negative() {
            return Err(LedgerError::InvalidAmount(
                "initial balance must not be negative".to_string(),
            ));
        }
        if !self.users.iter().any(|u| u.id == user_id) {
            return Err(LedgerError::NotFound(format!("user {user_id}")));
        }
        if self.wallets.iter().any(|w| w.user_id == user_id) {
            return Err(LedgerError::DuplicateOwner(user_id.to_string()));
        }
        let wallet = Wallet::new(user_id, initial_balance);
        self.wallets.push(wallet.clone());
        Ok(wallet)
    }

    fn debit_if_sufficient(&mut self, id: Uuid, amount: Coins) -> LedgerResult<DateTime<Utc>> {
        let wallet = self.wallet_mut(id)?;
        let remaining = wallet
            .balance
            .checked_sub(amount)
            .filter(|left| !left.is_negative())
            .ok_or_else(|| LedgerError::InsufficientFunds(format!("wallet {id}")))?;
        let now = Utc::now();
        wallet.balance = remaining;
        wallet.updated_at = now;
        Ok(now)
    }

    fn credit(&mut self, id: Uuid, amount: Coins) -> LedgerResult<DateTime<Utc>> {
        let wallet = self.wallet_mut(id)?;
        let total = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Storage(format!("balance overflow on wallet {id}")))?;
        let now = Utc::now();
        wallet.balance = total;
        wallet.updated_at = now;
        Ok(now)
    }

    fn append_transaction(
        &mut self,
        sender: Uuid,
        receiver: Uuid,
        amount: Coins,
    ) -> LedgerResult<Transaction> {
        self.wallet(sender)?;
        self.wallet(receiver)?;
        let record = Transaction {
            id: next_id(self.transactions.last().map(|t| t.id)),
            sender_wallet_id: sender,
            receiver_wallet_id: receiver,
            amount,
            created_at: Utc::now(),
        };
        self.transactions.push(record.clone());
        Ok(record)
    }

    fn transactions_by(
        &self,
        wallet_id: Uuid,
        what: &str,
        pick: impl Fn(&Transaction) -> Uuid,
    ) -> LedgerResult<Vec<Transaction>> {
        let rows: Vec<_> = self
            .transactions
            .iter()
            .filter(|t| pick(t) == wallet_id)
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(LedgerError::NotFound(format!("{what} for wallet {wallet_id}")));
        }
        Ok(rows)
    }

    fn append_order(&mut self, wallet_id: Uuid, item_id: Uuid, cost: Coins) -> LedgerResult<Order> {
        self.wallet(wallet_id)?;
        self.item(item_id)?;
        let order = Order {
            id: next_id(self.orders.last().map(|o| o.id)),
            wallet_id,
            item_id,
            cost,
            purchased_at: Utc::now(),
        };
        self.orders.push(order.clone());
        Ok(order)
    }

    fn orders_by_wallet(&self, wallet_id: Uuid) -> LedgerResult<Vec<Order>> {
        let rows: Vec<_> = self
            .orders
            .iter()
            .filter(|o| o.wallet_id == wallet_id)
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(LedgerError::NotFound(format!("orders for wallet {wallet_id}")));
        }
        Ok(rows)
    }

    fn insert_user(&mut self, user: &User) -> LedgerResult<User> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(LedgerError::DuplicateUsername(user.username.clone()));
        }
        self.users.push(user.clone());
        Ok(user.clone())
    }

    fn user(&self, id: Uuid) -> LedgerResult<User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("user {id}")))
    }

    fn user_by_username(&self, username: &str) -> LedgerResult<User> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("user {username}")))
    }

    fn item(&self, id: Uuid) -> LedgerResult<Item> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("item {id}")))
    }

    fn item_by_name(&self, name: &str) -> LedgerResult<Item> {
        self.items
            .iter()
            .find(|i| i.name == name)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("item {name}")))
    }
}

fn next_id(last: Option<i32>) -> i32 {
    last.map_or(1, |id| id + 1)
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with `(name, price)` pairs.
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let state = State {
            items: items
                .into_iter()
                .map(|(name, price)| Item {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    price: Coins::new(price),
                })
                .collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_next_commit: Arc::default(),
        }
    }

    /// Make the next [`AtomicUnit::commit`] fail with a storage error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    async fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }
}

/// An open unit on a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnit {
    published: OwnedMutexGuard<State>,
    staged: Mutex<State>,
    fail_commit: Arc<AtomicBool>,
}

impl MemoryUnit {
    async fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.staged.lock().await;
        f(&mut state)
    }
}

macro_rules! memory_stores {
    ($ty:ty) => {
        impl WalletStore for $ty {
            async fn wallet(&self, id: Uuid) -> LedgerResult<Wallet> {
                self.with_state(|s| s.wallet(id)).await
            }

            async fn wallet_by_owner(&self, user_id: Uuid) -> LedgerResult<Wallet> {
                self.with_state(|s| s.wallet_by_owner(user_id)).await
            }

            async fn create_wallet(
                &self,
                user_id: Uuid,
                initial_balance: Coins,
            ) -> LedgerResult<Wallet> {
                self.with_state(|s| s.create_wallet(user_id, initial_balance))
                    .await
            }

            async fn debit_if_sufficient(
                &self,
                id: Uuid,
                amount: Coins,
            ) -> LedgerResult<DateTime<Utc>> {
                self.with_state(|s| s.debit_if_sufficient(id, amount)).await
            }

            async fn credit(&self, id: Uuid, amount: Coins) -> LedgerResult<DateTime<Utc>> {
                self.with_state(|s| s.credit(id, amount)).await
            }
        }

        impl TransactionStore for $ty {
            async fn append_transaction(
                &self,
                sender: Uuid,
                receiver: Uuid,
                amount: Coins,
            ) -> LedgerResult<Transaction> {
                self.with_state(|s| s.append_transaction(sender, receiver, amount))
                    .await
            }

            async fn transactions_by_sender(
                &self,
                wallet_id: Uuid,
            ) -> LedgerResult<Vec<Transaction>> {
                self.with_state(|s| {
                    s.transactions_by(wallet_id, "sent transactions", |t| t.sender_wallet_id)
                })
                .await
            }

            async fn transactions_by_receiver(
                &self,
                wallet_id: Uuid,
            ) -> LedgerResult<Vec<Transaction>> {
                self.with_state(|s| {
                    s.transactions_by(wallet_id, "received transactions", |t| {
                        t.receiver_wallet_id
                    })
                })
                .await
            }
        }

        impl OrderStore for $ty {
            async fn append_order(
                &self,
                wallet_id: Uuid,
                item_id: Uuid,
                cost: Coins,
            ) -> LedgerResult<Order> {
                self.with_state(|s| s.append_order(wallet_id, item_id, cost))
                    .await
            }

            async fn orders_by_wallet(&self, wallet_id: Uuid) -> LedgerResult<Vec<Order>> {
                self.with_state(|s| s.orders_by_wallet(wallet_id)).await
            }
        }

        impl UserStore for $ty {
            async fn insert_user(&self, user: &User) -> LedgerResult<User> {
                self.with_state(|s| s.insert_user(user)).await
            }

            async fn user(&self, id: Uuid) -> LedgerResult<User> {
                self.with_state(|s| s.user(id)).await
            }

            async fn user_by_username(&self, username: &str) -> LedgerResult<User> {
                self.with_state(|s| s.user_by_username(username)).await
            }
        }
    };
}

memory_stores!(MemoryStore);
memory_stores!(MemoryUnit);

impl CatalogStore for MemoryStore {
    async fn item(&self, id: Uuid) -> LedgerResult<Item> {
        self.with_state(|s| s.item(id)).await
    }

    async fn item_by_name(&self, name: &str) -> LedgerResult<Item> {
        self.with_state(|s| s.item_by_name(name)).await
    }
}

impl AtomicUnit for MemoryUnit {
    async fn commit(self) -> LedgerResult<()> {
        let MemoryUnit {
            mut published,
            staged,
            fail_commit,
        } = self;
        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Storage("commit failed".to_string()));
        }
        *published = staged.into_inner();
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> LedgerResult<MemoryUnit> {
        let published = Arc::clone(&self.state).lock_owned().await;
        let staged = Mutex::new(published.clone());
        Ok(MemoryUnit {
            published,
            staged,
            fail_commit: Arc::clone(&self.fail_next_commit),
        })
    }
}
