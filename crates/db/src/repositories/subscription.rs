//! Subscription repository.
//!
//! A user has at most one active subscription. Rows are deactivated, never
//! deleted, so past subscriptions stay queryable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult};
use throttle_shared::TableNames;
use throttle_shared::types::{PlanId, SubscriptionId, UserId};

use super::execute;
use crate::models::{Subscription, UserIdRow};
use crate::schema::{Subscriptions, table};

/// Repository for subscriptions.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    tables: Arc<TableNames>,
}

impl SubscriptionRepository {
    const COLUMNS: [Subscriptions; 5] = [
        Subscriptions::Id,
        Subscriptions::UserId,
        Subscriptions::PlanId,
        Subscriptions::IsActive,
        Subscriptions::SubscribedAt,
    ];

    /// Creates a repository over the configured tables.
    #[must_use]
    pub const fn new(tables: Arc<TableNames>) -> Self {
        Self { tables }
    }

    /// Active subscription of `user`.
    pub async fn subscription<C>(&self, conn: &C, user: UserId) -> Result<Option<Subscription>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self
            .select_active()
            .and_where(Expr::col(Subscriptions::UserId).eq(user.into_inner()))
            .to_owned();
        Subscription::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Subscription by ID, active or not.
    pub async fn find_by_id<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
    ) -> Result<Option<Subscription>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscriptions))
            .and_where(Expr::col(Subscriptions::Id).eq(subscription.into_inner()))
            .to_owned();
        Subscription::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Every active subscription.
    pub async fn all<C>(&self, conn: &C) -> Result<Vec<Subscription>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self.select_active();
        Subscription::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }

    /// Users holding an active subscription.
    pub async fn all_user_ids<C>(&self, conn: &C) -> Result<Vec<UserId>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .distinct()
            .column(Subscriptions::UserId)
            .from(table(&self.tables.subscriptions))
            .and_where(Expr::col(Subscriptions::IsActive).eq(true))
            .order_by(Subscriptions::UserId, Order::Asc)
            .to_owned();
        let rows = UserIdRow::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await?;

        Ok(rows.into_iter().map(|row| UserId::from_uuid(row.user_id)).collect())
    }

    /// Active subscriptions on `plan`.
    pub async fn subscribers_of_plan<C>(
        &self,
        conn: &C,
        plan: PlanId,
    ) -> Result<Vec<Subscription>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self
            .select_active()
            .and_where(Expr::col(Subscriptions::PlanId).eq(plan.into_inner()))
            .to_owned();
        Subscription::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }

    /// Every subscription `user` ever held, oldest first.
    pub async fn history_of_user<C>(&self, conn: &C, user: UserId) -> Result<Vec<Subscription>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscriptions))
            .and_where(Expr::col(Subscriptions::UserId).eq(user.into_inner()))
            .order_by(Subscriptions::SubscribedAt, Order::Asc)
            .to_owned();
        Subscription::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }

    /// Deactivates the active subscription of `user`, if any.
    pub async fn deactivate_user<C>(&self, conn: &C, user: UserId) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscriptions))
            .value(Subscriptions::IsActive, false)
            .and_where(Expr::col(Subscriptions::UserId).eq(user.into_inner()))
            .and_where(Expr::col(Subscriptions::IsActive).eq(true))
            .to_owned();
        execute(conn, &update).await
    }

    /// Inserts an active subscription.
    pub async fn insert<C>(
        &self,
        conn: &C,
        user: UserId,
        plan: PlanId,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Subscription, DbErr>
    where
        C: ConnectionTrait,
    {
        let subscription = Subscription {
            id: SubscriptionId::new().into_inner(),
            user_id: user.into_inner(),
            plan_id: plan.into_inner(),
            is_active: true,
            subscribed_at,
        };

        let insert = Query::insert()
            .into_table(table(&self.tables.subscriptions))
            .columns(Self::COLUMNS)
            .values_panic([
                subscription.id.into(),
                subscription.user_id.into(),
                subscription.plan_id.into(),
                subscription.is_active.into(),
                subscription.subscribed_at.into(),
            ])
            .to_owned();
        execute(conn, &insert).await?;

        Ok(subscription)
    }

    /// Moves an active `subscription` to `plan`, restarting its subscription
    /// date.
    ///
    /// Deactivated subscriptions are history and are never changed; the
    /// returned row count is zero for them.
    pub async fn set_plan<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        plan: PlanId,
        subscribed_at: DateTime<Utc>,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscriptions))
            .value(Subscriptions::PlanId, plan.into_inner())
            .value(Subscriptions::SubscribedAt, subscribed_at)
            .and_where(Expr::col(Subscriptions::Id).eq(subscription.into_inner()))
            .and_where(Expr::col(Subscriptions::IsActive).eq(true))
            .to_owned();
        execute(conn, &update).await
    }

    fn select_active(&self) -> SelectStatement {
        Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscriptions))
            .and_where(Expr::col(Subscriptions::IsActive).eq(true))
            .order_by(Subscriptions::SubscribedAt, Order::Asc)
            .to_owned()
    }
}
