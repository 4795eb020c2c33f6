//! Purchase records. One row per successful purchase, never updated.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Coins, LedgerError, parse_id};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub id: i32,
    pub wallet_id: Uuid,
    pub item_id: Uuid,
    /// Price paid at purchase time.
    pub cost: Coins,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub wallet_id: String,
    pub merch_id: String,
    pub purchase_cost: i64,
    pub purchased_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallet,
    #[sea_orm(
        belongs_to = "super::merch::Entity",
        from = "Column::MerchId",
        to = "super::merch::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Merch,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::merch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn new_record(
    wallet_id: Uuid,
    item_id: Uuid,
    cost: Coins,
    purchased_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        wallet_id: ActiveValue::Set(wallet_id.to_string()),
        merch_id: ActiveValue::Set(item_id.to_string()),
        purchase_cost: ActiveValue::Set(cost.amount()),
        purchased_at: ActiveValue::Set(purchased_at),
    }
}

impl TryFrom<Model> for Order {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            wallet_id: parse_id(&model.wallet_id, "wallet")?,
            item_id: parse_id(&model.merch_id, "merch")?,
            cost: Coins::new(model.purchase_cost),
            purchased_at: model.purchased_at,
        })
    }
}
