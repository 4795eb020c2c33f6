//! User-facing flows: sign-in with auto-registration, sending coins by
//! username, buying by item name, and the wallet summary.

use tracing::info;
use uuid::Uuid;

use super::{History, Ledger, with_unit};
use crate::{
    AtomicUnit, CatalogStore, Coins, LedgerError, LedgerResult, LedgerStore, Order, Transaction,
    User, UserStore, WalletStore,
    credentials::{hash_password, normalize_username, validate_password, verify_password},
};

impl<S: LedgerStore> Ledger<S> {
    /// Sign a user in, registering them on first sight.
    ///
    /// A new user gets a wallet holding the starting balance; user and wallet
    /// are created in the same atomic unit.
    pub async fn authenticate(&self, username: &str, password: &str) -> LedgerResult<User> {
        let username = normalize_username(username)?;
        validate_password(password)?;

        let user = match self.store.user_by_username(&username).await {
            Ok(user) => user,
            Err(LedgerError::NotFound(_)) => self.register(username, password).await?,
            Err(err) => return Err(err),
        };

        let (candidate, stored) = (password.to_owned(), user.password_hash.clone());
        if !off_runtime(move || verify_password(&candidate, &stored)).await? {
            return Err(LedgerError::InvalidCredentials);
        }
        Ok(user)
    }

    async fn register(&self, username: String, password: &str) -> LedgerResult<User> {
        let password = password.to_owned();
        let hash = off_runtime(move || hash_password(&password)).await?;
        let user = User::new(username, hash);
        match self.create_account(&user).await {
            Ok(user) => {
                info!(user_id = %user.id, username = %user.username, "user registered");
                Ok(user)
            }
            // Lost a registration race: the other caller's user stands.
            Err(LedgerError::DuplicateUsername(name)) => self.store.user_by_username(&name).await,
            Err(err) => Err(err),
        }
    }

    async fn create_account(&self, user: &User) -> LedgerResult<User> {
        with_unit!(self, |unit| {
            let user = unit.insert_user(user).await?;
            unit.create_wallet(user.id, self.starting_balance).await?;
            Ok(user)
        })
    }

    /// Transfer coins from a user to the user called `to_username`.
    pub async fn send_coin(
        &self,
        sender_id: Uuid,
        to_username: &str,
        amount: Coins,
    ) -> LedgerResult<Transaction> {
        let to_username = normalize_username(to_username)?;
        let sender = self.store.wallet_by_owner(sender_id).await?;
        let receiver = self.store.user_by_username(&to_username).await?;
        let receiver = self.store.wallet_by_owner(receiver.id).await?;
        self.transfer(sender.id, receiver.id, amount).await
    }

    /// Buy one unit of the catalog item called `item_name` at its list price.
    pub async fn buy_item(&self, user_id: Uuid, item_name: &str) -> LedgerResult<Order> {
        let item = self.store.item_by_name(item_name).await?;
        let wallet = self.store.wallet_by_owner(user_id).await?;
        self.purchase(wallet.id, item.id, item.price).await
    }

    /// History of the user's wallet.
    pub async fn info(&self, user_id: Uuid) -> LedgerResult<History> {
        let wallet = self.store.wallet_by_owner(user_id).await?;
        self.history(wallet.id).await
    }
}

/// Run a CPU-heavy credential job on the blocking pool.
async fn off_runtime<T, F>(job: F) -> LedgerResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| LedgerError::Credential(err.to_string()))?
}
