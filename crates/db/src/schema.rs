//! Table and column identifiers, and the DDL built from the configured names.
//!
//! Table names are never compiled in: every statement takes them from
//! [`TableNames`], so the same code serves any naming scheme.

use sea_orm::sea_query::{
    Alias, ColumnDef, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, Table,
    TableCreateStatement, TableDropStatement,
};
use sea_orm::{ConnectionTrait, DbErr, DeriveIden};
use throttle_shared::TableNames;

/// Columns of the subscriptions table.
#[derive(DeriveIden, Clone, Copy)]
pub enum Subscriptions {
    /// Primary key.
    Id,
    /// Subscriber.
    UserId,
    /// Subscribed plan.
    PlanId,
    /// Whether this is the user's live subscription.
    IsActive,
    /// When the plan was (re)subscribed.
    SubscribedAt,
}

/// Columns of the features table.
#[derive(DeriveIden, Clone, Copy)]
pub enum Features {
    /// Primary key.
    Id,
    /// Stable identifier used by callers (e.g. "api_calls").
    Identifier,
    /// Display name.
    Name,
    /// `max` or `sum`.
    Aggregator,
}

/// Columns of the plans table.
#[derive(DeriveIden, Clone, Copy)]
pub enum Plans {
    /// Primary key.
    Id,
    /// Stable identifier used by callers (e.g. "basic").
    Identifier,
    /// Display name.
    Name,
}

/// Columns of the plan/feature tier table.
#[derive(DeriveIden, Clone, Copy)]
pub enum PlanFeature {
    /// Primary key.
    Id,
    /// Plan the tier belongs to.
    PlanId,
    /// Feature the tier limits.
    FeatureId,
    /// Tier number.
    Tier,
    /// Granted quantity, NULL for unlimited.
    Limit,
}

/// Columns of the limit ledger.
#[derive(DeriveIden, Clone, Copy)]
pub enum SubscriptionFeatureLimit {
    /// Primary key.
    Id,
    /// Owning subscription.
    SubscriptionId,
    /// Limited feature.
    FeatureId,
    /// Effective limit, NULL for unlimited.
    Limit,
    /// Ledger status code.
    Status,
}

/// Columns of the usage ledger.
#[derive(DeriveIden, Clone, Copy)]
pub enum SubscriptionFeatureUsage {
    /// Primary key.
    Id,
    /// Owning subscription.
    SubscriptionId,
    /// Metered feature.
    FeatureId,
    /// Quantity used on `date`.
    UsedQuantity,
    /// Day of the usage.
    Date,
    /// Ledger status code.
    Status,
}

/// Columns of the subscription period table.
#[derive(DeriveIden, Clone, Copy)]
pub enum SubscriptionPeriods {
    /// Primary key.
    Id,
    /// Owning subscription.
    SubscriptionId,
    /// First day of the period.
    StartsOn,
    /// Last day of the period.
    EndsOn,
    /// Whether the period is still open.
    IsActive,
}

/// Identifier of a configured table.
pub(crate) fn table(name: &str) -> Alias {
    Alias::new(name)
}

/// `CREATE TABLE` statements in dependency order.
#[must_use]
pub fn create_table_statements(tables: &TableNames) -> Vec<TableCreateStatement> {
    vec![
        Table::create()
            .table(table(&tables.plans))
            .if_not_exists()
            .col(ColumnDef::new(Plans::Id).uuid().not_null().primary_key())
            .col(
                ColumnDef::new(Plans::Identifier)
                    .string_len(64)
                    .not_null()
                    .unique_key(),
            )
            .col(ColumnDef::new(Plans::Name).string_len(255).not_null())
            .to_owned(),
        Table::create()
            .table(table(&tables.features))
            .if_not_exists()
            .col(ColumnDef::new(Features::Id).uuid().not_null().primary_key())
            .col(
                ColumnDef::new(Features::Identifier)
                    .string_len(64)
                    .not_null()
                    .unique_key(),
            )
            .col(ColumnDef::new(Features::Name).string_len(255).not_null())
            .col(
                ColumnDef::new(Features::Aggregator)
                    .string_len(8)
                    .not_null()
                    .default("sum"),
            )
            .to_owned(),
        Table::create()
            .table(table(&tables.plan_feature))
            .if_not_exists()
            .col(ColumnDef::new(PlanFeature::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(PlanFeature::PlanId).uuid().not_null())
            .col(ColumnDef::new(PlanFeature::FeatureId).uuid().not_null())
            .col(ColumnDef::new(PlanFeature::Tier).integer().not_null().default(1))
            .col(ColumnDef::new(PlanFeature::Limit).big_integer().null())
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_plan", tables.plan_feature))
                    .from(table(&tables.plan_feature), PlanFeature::PlanId)
                    .to(table(&tables.plans), Plans::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_feature", tables.plan_feature))
                    .from(table(&tables.plan_feature), PlanFeature::FeatureId)
                    .to(table(&tables.features), Features::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned(),
        Table::create()
            .table(table(&tables.subscriptions))
            .if_not_exists()
            .col(ColumnDef::new(Subscriptions::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(Subscriptions::UserId).uuid().not_null())
            .col(ColumnDef::new(Subscriptions::PlanId).uuid().not_null())
            .col(
                ColumnDef::new(Subscriptions::IsActive)
                    .boolean()
                    .not_null()
                    .default(true),
            )
            .col(
                ColumnDef::new(Subscriptions::SubscribedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_plan", tables.subscriptions))
                    .from(table(&tables.subscriptions), Subscriptions::PlanId)
                    .to(table(&tables.plans), Plans::Id),
            )
            .to_owned(),
        Table::create()
            .table(table(&tables.subscription_feature_limit))
            .if_not_exists()
            .col(
                ColumnDef::new(SubscriptionFeatureLimit::Id)
                    .uuid()
                    .not_null()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureLimit::SubscriptionId)
                    .uuid()
                    .not_null(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureLimit::FeatureId)
                    .uuid()
                    .not_null(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureLimit::Limit)
                    .big_integer()
                    .null(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureLimit::Status)
                    .string_len(32)
                    .not_null()
                    .default("active"),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_subscription", tables.subscription_feature_limit))
                    .from(
                        table(&tables.subscription_feature_limit),
                        SubscriptionFeatureLimit::SubscriptionId,
                    )
                    .to(table(&tables.subscriptions), Subscriptions::Id),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_feature", tables.subscription_feature_limit))
                    .from(
                        table(&tables.subscription_feature_limit),
                        SubscriptionFeatureLimit::FeatureId,
                    )
                    .to(table(&tables.features), Features::Id),
            )
            .to_owned(),
        Table::create()
            .table(table(&tables.subscription_feature_usage))
            .if_not_exists()
            .col(
                ColumnDef::new(SubscriptionFeatureUsage::Id)
                    .uuid()
                    .not_null()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureUsage::SubscriptionId)
                    .uuid()
                    .not_null(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureUsage::FeatureId)
                    .uuid()
                    .not_null(),
            )
            .col(
                ColumnDef::new(SubscriptionFeatureUsage::UsedQuantity)
                    .big_integer()
                    .not_null()
                    .default(0),
            )
            .col(ColumnDef::new(SubscriptionFeatureUsage::Date).date().not_null())
            .col(
                ColumnDef::new(SubscriptionFeatureUsage::Status)
                    .string_len(32)
                    .not_null()
                    .default("active"),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_subscription", tables.subscription_feature_usage))
                    .from(
                        table(&tables.subscription_feature_usage),
                        SubscriptionFeatureUsage::SubscriptionId,
                    )
                    .to(table(&tables.subscriptions), Subscriptions::Id),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_feature", tables.subscription_feature_usage))
                    .from(
                        table(&tables.subscription_feature_usage),
                        SubscriptionFeatureUsage::FeatureId,
                    )
                    .to(table(&tables.features), Features::Id),
            )
            .to_owned(),
        Table::create()
            .table(table(&tables.subscription_periods))
            .if_not_exists()
            .col(
                ColumnDef::new(SubscriptionPeriods::Id)
                    .uuid()
                    .not_null()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(SubscriptionPeriods::SubscriptionId)
                    .uuid()
                    .not_null(),
            )
            .col(ColumnDef::new(SubscriptionPeriods::StartsOn).date().not_null())
            .col(ColumnDef::new(SubscriptionPeriods::EndsOn).date().not_null())
            .col(
                ColumnDef::new(SubscriptionPeriods::IsActive)
                    .boolean()
                    .not_null()
                    .default(true),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_subscription", tables.subscription_periods))
                    .from(
                        table(&tables.subscription_periods),
                        SubscriptionPeriods::SubscriptionId,
                    )
                    .to(table(&tables.subscriptions), Subscriptions::Id),
            )
            .to_owned(),
    ]
}

/// Lookup indexes for the hot paths.
///
/// "At most one active row" is kept by the ledgers, not by unique indexes.
#[must_use]
pub fn create_index_statements(tables: &TableNames) -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .if_not_exists()
            .name(format!("idx_{}_user_active", tables.subscriptions))
            .table(table(&tables.subscriptions))
            .col(Subscriptions::UserId)
            .col(Subscriptions::IsActive)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name(format!("idx_{}_plan", tables.plan_feature))
            .table(table(&tables.plan_feature))
            .col(PlanFeature::PlanId)
            .col(PlanFeature::FeatureId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name(format!("idx_{}_lookup", tables.subscription_feature_limit))
            .table(table(&tables.subscription_feature_limit))
            .col(SubscriptionFeatureLimit::SubscriptionId)
            .col(SubscriptionFeatureLimit::FeatureId)
            .col(SubscriptionFeatureLimit::Status)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name(format!("idx_{}_lookup", tables.subscription_feature_usage))
            .table(table(&tables.subscription_feature_usage))
            .col(SubscriptionFeatureUsage::SubscriptionId)
            .col(SubscriptionFeatureUsage::FeatureId)
            .col(SubscriptionFeatureUsage::Date)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name(format!("idx_{}_subscription", tables.subscription_periods))
            .table(table(&tables.subscription_periods))
            .col(SubscriptionPeriods::SubscriptionId)
            .to_owned(),
    ]
}

/// `DROP TABLE` statements in reverse dependency order.
#[must_use]
pub fn drop_table_statements(tables: &TableNames) -> Vec<TableDropStatement> {
    [
        &tables.subscription_periods,
        &tables.subscription_feature_usage,
        &tables.subscription_feature_limit,
        &tables.subscriptions,
        &tables.plan_feature,
        &tables.features,
        &tables.plans,
    ]
    .into_iter()
    .map(|name| Table::drop().table(table(name)).if_exists().to_owned())
    .collect()
}

/// Creates every table and index on `conn` if missing.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn install<C>(conn: &C, tables: &TableNames) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();

    for statement in create_table_statements(tables) {
        conn.execute(backend.build(&statement)).await?;
    }
    for statement in create_index_statements(tables) {
        conn.execute(backend.build(&statement)).await?;
    }

    Ok(())
}
