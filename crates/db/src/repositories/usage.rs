//! Usage ledger.
//!
//! One active row per (subscription, feature, day). Rows appear on the first
//! non-zero touch of a day and are only ever updated afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult};
use throttle_core::{Aggregator, DailyUsage, LedgerStatus, SupersedeReason, aggregate_usage};
use throttle_shared::TableNames;
use throttle_shared::types::{FeatureId, PlanId, SubscriptionId};
use uuid::Uuid;

use super::{PlanCatalog, execute};
use crate::error::ThrottleResult;
use crate::models::{FeatureUsage, FeatureUsageTotal, UsageAggregateRow};
use crate::schema::{Features, PlanFeature, SubscriptionFeatureUsage, table};

/// Repository for the usage ledger.
#[derive(Debug, Clone)]
pub struct UsageLedger {
    tables: Arc<TableNames>,
    catalog: PlanCatalog,
}

impl UsageLedger {
    const COLUMNS: [SubscriptionFeatureUsage; 6] = [
        SubscriptionFeatureUsage::Id,
        SubscriptionFeatureUsage::SubscriptionId,
        SubscriptionFeatureUsage::FeatureId,
        SubscriptionFeatureUsage::UsedQuantity,
        SubscriptionFeatureUsage::Date,
        SubscriptionFeatureUsage::Status,
    ];

    /// Creates a ledger over the configured tables.
    #[must_use]
    pub fn new(tables: Arc<TableNames>) -> Self {
        let catalog = PlanCatalog::new(Arc::clone(&tables));
        Self { tables, catalog }
    }

    /// Adds `count` to the usage of `date`.
    ///
    /// The row of the day is created on demand, except for a zero count.
    pub async fn increment<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        count: i64,
        date: NaiveDate,
    ) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_feature_usage))
            .value(
                SubscriptionFeatureUsage::UsedQuantity,
                Expr::col(SubscriptionFeatureUsage::UsedQuantity).add(count),
            )
            .and_where(
                Expr::col(SubscriptionFeatureUsage::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(Expr::col(SubscriptionFeatureUsage::FeatureId).eq(feature.into_inner()))
            .and_where(Expr::col(SubscriptionFeatureUsage::Date).eq(date))
            .and_where(
                Expr::col(SubscriptionFeatureUsage::Status).eq(LedgerStatus::Active.as_str()),
            )
            .to_owned();

        if execute(conn, &update).await? == 0 && count != 0 {
            self.insert_usage(conn, subscription, feature, count, date).await?;
        }

        Ok(())
    }

    /// Raises the usage of `date` to `count`, never lowering it.
    pub async fn refresh_usage<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        count: i64,
        date: NaiveDate,
    ) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_feature_usage))
            .value(SubscriptionFeatureUsage::UsedQuantity, count)
            .and_where(
                Expr::col(SubscriptionFeatureUsage::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(Expr::col(SubscriptionFeatureUsage::FeatureId).eq(feature.into_inner()))
            .and_where(Expr::col(SubscriptionFeatureUsage::Date).eq(date))
            .and_where(
                Expr::col(SubscriptionFeatureUsage::Status).eq(LedgerStatus::Active.as_str()),
            )
            .and_where(Expr::col(SubscriptionFeatureUsage::UsedQuantity).lt(count))
            .to_owned();

        if execute(conn, &update).await? > 0 || count <= 0 {
            return Ok(());
        }

        if self.usage_on(conn, subscription, feature, date).await?.is_none() {
            self.insert_usage(conn, subscription, feature, count, date).await?;
        }

        Ok(())
    }

    /// Inserts a zero row of `date` for each feature lacking one.
    ///
    /// Returns the number of rows inserted.
    pub async fn seed_base<C, I>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        features: I,
        date: NaiveDate,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
        I: IntoIterator<Item = FeatureId>,
    {
        let mut inserted = 0;
        for feature in features {
            if self.usage_on(conn, subscription, feature, date).await?.is_none() {
                inserted += self.insert_usage(conn, subscription, feature, 0, date).await?;
            }
        }
        Ok(inserted)
    }

    /// Period totals of every feature currently attached to `plan`.
    ///
    /// Only active rows inside `[start, end]` count; `end` defaults to today.
    /// Features without rows total zero. Rows of features no longer attached
    /// to the plan are ignored.
    pub async fn aggregate<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        plan: PlanId,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> ThrottleResult<Vec<FeatureUsageTotal>>
    where
        C: ConnectionTrait,
    {
        let end = end.unwrap_or_else(throttle_core::period::today);
        let features = self.catalog.plan_features(conn, plan).await?;

        let usage = table(&self.tables.subscription_feature_usage);
        let catalog = table(&self.tables.features);
        let attached = Query::select()
            .column(PlanFeature::FeatureId)
            .from(table(&self.tables.plan_feature))
            .and_where(Expr::col(PlanFeature::PlanId).eq(plan.into_inner()))
            .to_owned();

        let select = Query::select()
            .column((usage.clone(), SubscriptionFeatureUsage::FeatureId))
            .column((catalog.clone(), Features::Aggregator))
            .column((usage.clone(), SubscriptionFeatureUsage::Date))
            .column((usage.clone(), SubscriptionFeatureUsage::UsedQuantity))
            .from(usage.clone())
            .inner_join(
                catalog.clone(),
                Expr::col((catalog, Features::Id))
                    .equals((usage.clone(), SubscriptionFeatureUsage::FeatureId)),
            )
            .and_where(
                Expr::col((usage.clone(), SubscriptionFeatureUsage::SubscriptionId))
                    .eq(subscription.into_inner()),
            )
            .and_where(
                Expr::col((usage.clone(), SubscriptionFeatureUsage::Status))
                    .eq(LedgerStatus::Active.as_str()),
            )
            .and_where(Expr::col((usage.clone(), SubscriptionFeatureUsage::Date)).between(start, end))
            .and_where(
                Expr::col((usage, SubscriptionFeatureUsage::FeatureId)).in_subquery(attached),
            )
            .to_owned();

        let rows = UsageAggregateRow::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await?;

        let daily = rows
            .into_iter()
            .map(|row| {
                Ok(DailyUsage {
                    feature_id: FeatureId::from_uuid(row.feature_id),
                    aggregator: row.aggregator.parse()?,
                    date: row.date,
                    used_quantity: row.used_quantity,
                })
            })
            .collect::<ThrottleResult<Vec<_>>>()?;
        let totals: BTreeMap<FeatureId, i64> = aggregate_usage(&daily);

        features
            .into_iter()
            .map(|feature| {
                let feature_id = feature.feature_id();
                Ok(FeatureUsageTotal {
                    feature_id,
                    aggregator: feature.aggregator()?,
                    used_quantity: totals.get(&feature_id).copied().unwrap_or(0),
                    identifier: feature.identifier,
                })
            })
            .collect()
    }

    /// Period total of one feature, collapsed with `aggregator`.
    pub async fn feature_total<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        aggregator: Aggregator,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self
            .select_active(subscription, feature)
            .and_where(Expr::col(SubscriptionFeatureUsage::Date).between(start, end))
            .to_owned();
        let rows = FeatureUsage::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await?;

        Ok(aggregator.collapse(rows.into_iter().map(|row| row.used_quantity)))
    }

    /// Active row of one feature on `date`.
    pub async fn usage_on<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        date: NaiveDate,
    ) -> Result<Option<FeatureUsage>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self
            .select_active(subscription, feature)
            .and_where(Expr::col(SubscriptionFeatureUsage::Date).eq(date))
            .to_owned();
        FeatureUsage::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Marks every active row of one feature inactive.
    pub async fn supersede_usage<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        reason: SupersedeReason,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_feature_usage))
            .value(SubscriptionFeatureUsage::Status, reason.status().as_str())
            .and_where(
                Expr::col(SubscriptionFeatureUsage::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(Expr::col(SubscriptionFeatureUsage::FeatureId).eq(feature.into_inner()))
            .and_where(
                Expr::col(SubscriptionFeatureUsage::Status).eq(LedgerStatus::Active.as_str()),
            )
            .to_owned();
        execute(conn, &update).await
    }

    /// Every row of `subscription`, superseded ones included.
    pub async fn history<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
    ) -> Result<Vec<FeatureUsage>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscription_feature_usage))
            .and_where(
                Expr::col(SubscriptionFeatureUsage::SubscriptionId).eq(subscription.into_inner()),
            )
            .order_by(SubscriptionFeatureUsage::Date, Order::Asc)
            .order_by(SubscriptionFeatureUsage::Id, Order::Asc)
            .to_owned();
        FeatureUsage::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }

    fn select_active(&self, subscription: SubscriptionId, feature: FeatureId) -> SelectStatement {
        Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscription_feature_usage))
            .and_where(
                Expr::col(SubscriptionFeatureUsage::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(Expr::col(SubscriptionFeatureUsage::FeatureId).eq(feature.into_inner()))
            .and_where(
                Expr::col(SubscriptionFeatureUsage::Status).eq(LedgerStatus::Active.as_str()),
            )
            .order_by(SubscriptionFeatureUsage::Date, Order::Asc)
            .to_owned()
    }

    async fn insert_usage<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        count: i64,
        date: NaiveDate,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let insert = Query::insert()
            .into_table(table(&self.tables.subscription_feature_usage))
            .columns(Self::COLUMNS)
            .values_panic([
                Uuid::now_v7().into(),
                subscription.into_inner().into(),
                feature.into_inner().into(),
                count.into(),
                date.into(),
                LedgerStatus::Active.as_str().into(),
            ])
            .to_owned();
        execute(conn, &insert).await
    }
}
