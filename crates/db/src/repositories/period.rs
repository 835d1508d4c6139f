//! Recorded billing periods of subscriptions.

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, Order, Query};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult};
use throttle_shared::TableNames;
use throttle_shared::types::{SubscriptionId, UserId};
use uuid::Uuid;

use super::execute;
use crate::models::SubscriptionPeriod;
use crate::schema::{SubscriptionPeriods, Subscriptions, table};

/// Repository for subscription periods.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    tables: Arc<TableNames>,
}

impl PeriodRepository {
    const COLUMNS: [SubscriptionPeriods; 5] = [
        SubscriptionPeriods::Id,
        SubscriptionPeriods::SubscriptionId,
        SubscriptionPeriods::StartsOn,
        SubscriptionPeriods::EndsOn,
        SubscriptionPeriods::IsActive,
    ];

    /// Creates a repository over the configured tables.
    #[must_use]
    pub const fn new(tables: Arc<TableNames>) -> Self {
        Self { tables }
    }

    /// Records an open period `[starts_on, ends_on]`.
    pub async fn store<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<SubscriptionPeriod, DbErr>
    where
        C: ConnectionTrait,
    {
        let period = SubscriptionPeriod {
            id: Uuid::now_v7(),
            subscription_id: subscription.into_inner(),
            starts_on,
            ends_on,
            is_active: true,
        };

        let insert = Query::insert()
            .into_table(table(&self.tables.subscription_periods))
            .columns(Self::COLUMNS)
            .values_panic([
                period.id.into(),
                period.subscription_id.into(),
                period.starts_on.into(),
                period.ends_on.into(),
                period.is_active.into(),
            ])
            .to_owned();
        execute(conn, &insert).await?;

        Ok(period)
    }

    /// Closes every open period of any subscription of `user`.
    pub async fn close_periods_of_user<C>(&self, conn: &C, user: UserId) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let subscriptions = Query::select()
            .column(Subscriptions::Id)
            .from(table(&self.tables.subscriptions))
            .and_where(Expr::col(Subscriptions::UserId).eq(user.into_inner()))
            .to_owned();

        let update = Query::update()
            .table(table(&self.tables.subscription_periods))
            .value(SubscriptionPeriods::IsActive, false)
            .and_where(Expr::col(SubscriptionPeriods::IsActive).eq(true))
            .and_where(Expr::col(SubscriptionPeriods::SubscriptionId).in_subquery(subscriptions))
            .to_owned();
        execute(conn, &update).await
    }

    /// Closes the open periods of one subscription.
    pub async fn close_periods<C>(&self, conn: &C, subscription: SubscriptionId) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_periods))
            .value(SubscriptionPeriods::IsActive, false)
            .and_where(Expr::col(SubscriptionPeriods::IsActive).eq(true))
            .and_where(Expr::col(SubscriptionPeriods::SubscriptionId).eq(subscription.into_inner()))
            .to_owned();
        execute(conn, &update).await
    }

    /// Open period of `subscription`, if any.
    pub async fn active_period<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
    ) -> Result<Option<SubscriptionPeriod>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscription_periods))
            .and_where(Expr::col(SubscriptionPeriods::SubscriptionId).eq(subscription.into_inner()))
            .and_where(Expr::col(SubscriptionPeriods::IsActive).eq(true))
            .order_by(SubscriptionPeriods::StartsOn, Order::Desc)
            .to_owned();
        SubscriptionPeriod::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }
}
