//! Seeds the merch catalog.

use sea_orm_migration::prelude::*;

use crate::m20250210_090000_init::Merch;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Shop items and their prices in coins.
const CATALOG: &[(&str, i64)] = &[
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(Merch::Table)
            .columns([Merch::Id, Merch::Name, Merch::Price]);

        for (name, price) in CATALOG {
            insert
                .values([
                    uuid::Uuid::new_v4().to_string().into(),
                    (*name).into(),
                    (*price).into(),
                ])
                .map_err(|e| DbErr::Migration(e.to_string()))?;
        }

        manager.exec_stmt(insert).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let names = CATALOG.iter().map(|(name, _)| *name);
        let delete = Query::delete()
            .from_table(Merch::Table)
            .and_where(Expr::col(Merch::Name).is_in(names))
            .to_owned();
        manager.exec_stmt(delete).await?;
        Ok(())
    }
}
