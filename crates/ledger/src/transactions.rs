//! Transfer records.
//!
//! A row is written exactly once per successful transfer and never updated.
//! Ids are assigned by the store in insertion order.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Coins, LedgerError, parse_id};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: i32,
    pub sender_wallet_id: Uuid,
    pub receiver_wallet_id: Uuid,
    pub amount: Coins,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sender_wallet_id: String,
    pub receiver_wallet_id: String,
    pub amount: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::SenderWalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sender,
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::ReceiverWalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Receiver,
}

impl ActiveModelBehavior for ActiveModel {}

/// Insert model for a new record; the id is left to the database.
pub(crate) fn new_record(
    sender: Uuid,
    receiver: Uuid,
    amount: Coins,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        sender_wallet_id: ActiveValue::Set(sender.to_string()),
        receiver_wallet_id: ActiveValue::Set(receiver.to_string()),
        amount: ActiveValue::Set(amount.amount()),
        created_at: ActiveValue::Set(created_at),
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            sender_wallet_id: parse_id(&model.sender_wallet_id, "wallet")?,
            receiver_wallet_id: parse_id(&model.receiver_wallet_id, "wallet")?,
            amount: Coins::new(model.amount),
            created_at: model.created_at,
        })
    }
}
