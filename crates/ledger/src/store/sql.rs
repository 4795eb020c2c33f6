//! sea-orm backed store.
//!
//! `SqlStore<DatabaseConnection>` serves reads outside of any unit;
//! `SqlUnit` wraps an open `DatabaseTransaction`.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{
    AtomicUnit, CatalogStore, LedgerStore, OrderStore, TransactionStore, UserStore, WalletStore,
};
use crate::{
    Coins, Item, LedgerError, LedgerResult, Order, Transaction, User, Wallet, merch, orders,
    transactions, users, wallets,
};

#[derive(Clone, Debug)]
pub struct SqlStore<C = DatabaseConnection> {
    conn: C,
}

/// A `SqlStore` running inside a database transaction.
pub type SqlUnit = SqlStore<DatabaseTransaction>;

impl SqlStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { conn: database }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

fn non_empty<T>(rows: Vec<T>, what: &str, wallet_id: Uuid) -> LedgerResult<Vec<T>> {
    if rows.is_empty() {
        return Err(LedgerError::NotFound(format!("{what} for wallet {wallet_id}")));
    }
    Ok(rows)
}

impl<C> WalletStore for SqlStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn wallet(&self, id: Uuid) -> LedgerResult<Wallet> {
        wallets::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {id}")))?
            .try_into()
    }

    async fn wallet_by_owner(&self, user_id: Uuid) -> LedgerResult<Wallet> {
        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id.to_string()))
            .one(&self.conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("wallet of user {user_id}")))?
            .try_into()
    }

    async fn create_wallet(&self, user_id: Uuid, initial_balance: Coins) -> LedgerResult<Wallet> {
        if initial_balance.is_negative() {
            return Err(LedgerError::InvalidAmount(
                "initial balance must not be negative".to_string(),
            ));
        }
        let wallet = Wallet::new(user_id, initial_balance);
        wallets::ActiveModel::from(&wallet)
            .insert(&self.conn)
            .await
            .map_err(|err| {
                LedgerError::from_write(
                    err,
                    &format!("user {user_id}"),
                    LedgerError::DuplicateOwner(user_id.to_string()),
                )
            })?;
        Ok(wallet)
    }

    async fn debit_if_sufficient(&self, id: Uuid, amount: Coins) -> LedgerResult<DateTime<Utc>> {
        let now = Utc::now();
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).sub(amount.amount()),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
            .filter(wallets::Column::Id.eq(id.to_string()))
            .filter(wallets::Column::Balance.gte(amount.amount()))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            // Either the wallet is missing or the guard rejected the debit.
            self.wallet(id).await?;
            return Err(LedgerError::InsufficientFunds(format!("wallet {id}")));
        }
        Ok(now)
    }

    async fn credit(&self, id: Uuid, amount: Coins) -> LedgerResult<DateTime<Utc>> {
        let now = Utc::now();
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(amount.amount()),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
            .filter(wallets::Column::Id.eq(id.to_string()))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(LedgerError::NotFound(format!("wallet {id}")));
        }
        Ok(now)
    }
}

impl<C> TransactionStore for SqlStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn append_transaction(
        &self,
        sender: Uuid,
        receiver: Uuid,
        amount: Coins,
    ) -> LedgerResult<Transaction> {
        transactions::new_record(sender, receiver, amount, Utc::now())
            .insert(&self.conn)
            .await
            .map_err(|err| {
                LedgerError::from_write(
                    err,
                    "wallet",
                    LedgerError::Storage("duplicate transaction id".to_string()),
                )
            })?
            .try_into()
    }

    async fn transactions_by_sender(&self, wallet_id: Uuid) -> LedgerResult<Vec<Transaction>> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::SenderWalletId.eq(wallet_id.to_string()))
            .order_by_asc(transactions::Column::Id)
            .all(&self.conn)
            .await?;
        non_empty(rows, "sent transactions", wallet_id)?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn transactions_by_receiver(&self, wallet_id: Uuid) -> LedgerResult<Vec<Transaction>> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::ReceiverWalletId.eq(wallet_id.to_string()))
            .order_by_asc(transactions::Column::Id)
            .all(&self.conn)
            .await?;
        non_empty(rows, "received transactions", wallet_id)?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

impl<C> OrderStore for SqlStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn append_order(&self, wallet_id: Uuid, item_id: Uuid, cost: Coins) -> LedgerResult<Order> {
        orders::new_record(wallet_id, item_id, cost, Utc::now())
            .insert(&self.conn)
            .await
            .map_err(|err| {
                LedgerError::from_write(
                    err,
                    "wallet or item",
                    LedgerError::Storage("duplicate order id".to_string()),
                )
            })?
            .try_into()
    }

    async fn orders_by_wallet(&self, wallet_id: Uuid) -> LedgerResult<Vec<Order>> {
        let rows = orders::Entity::find()
            .filter(orders::Column::WalletId.eq(wallet_id.to_string()))
            .order_by_asc(orders::Column::Id)
            .all(&self.conn)
            .await?;
        non_empty(rows, "orders", wallet_id)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }
}

impl<C> UserStore for SqlStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn insert_user(&self, user: &User) -> LedgerResult<User> {
        users::ActiveModel::from(user)
            .insert(&self.conn)
            .await
            .map_err(|err| {
                LedgerError::from_write(
                    err,
                    "user",
                    LedgerError::DuplicateUsername(user.username.clone()),
                )
            })?
            .try_into()
    }

    async fn user(&self, id: Uuid) -> LedgerResult<User> {
        users::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {id}")))?
            .try_into()
    }

    async fn user_by_username(&self, username: &str) -> LedgerResult<User> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {username}")))?
            .try_into()
    }
}

impl<C> CatalogStore for SqlStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn item(&self, id: Uuid) -> LedgerResult<Item> {
        merch::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("item {id}")))?
            .try_into()
    }

    async fn item_by_name(&self, name: &str) -> LedgerResult<Item> {
        merch::Entity::find()
            .filter(merch::Column::Name.eq(name))
            .one(&self.conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("item {name}")))?
            .try_into()
    }
}

impl AtomicUnit for SqlUnit {
    async fn commit(self) -> LedgerResult<()> {
        self.conn.commit().await?;
        Ok(())
    }
}

impl LedgerStore for SqlStore {
    type Unit = SqlUnit;

    async fn begin(&self) -> LedgerResult<SqlUnit> {
        Ok(SqlStore {
            conn: self.conn.begin().await?,
        })
    }
}
