//! Initial migration creating the catalog, the subscriptions, both ledgers
//! and the period table.
//!
//! Table names come from the `tables.*` configuration, so the migration
//! always matches the names the ledgers query.

use sea_orm_migration::prelude::*;
use throttle_shared::TableNames;

use crate::schema::{create_index_statements, create_table_statements, drop_table_statements};

#[derive(DeriveMigrationName)]
pub struct Migration;

fn table_names() -> Result<TableNames, DbErr> {
    TableNames::load().map_err(|err| DbErr::Custom(format!("Invalid table configuration: {err}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let tables = table_names()?;

        for statement in create_table_statements(&tables) {
            manager.create_table(statement).await?;
        }
        for statement in create_index_statements(&tables) {
            manager.create_index(statement).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let tables = table_names()?;

        for statement in drop_table_statements(&tables) {
            manager.drop_table(statement).await?;
        }

        Ok(())
    }
}
