//! Plan and feature catalog.
//!
//! Resolves plan identifiers and exposes the tiered limits of each plan.
//! The administrative writes exist for seeding and tooling.

use std::sync::Arc;

use sea_orm::sea_query::{Expr, Order, Query};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult};
use throttle_core::{Aggregator, PlanTier};
use throttle_shared::TableNames;
use throttle_shared::types::{FeatureId, PlanId};

use super::execute;
use crate::models::{Feature, Plan, PlanTierRow};
use crate::schema::{Features, PlanFeature, Plans, table};

/// Repository for the plan/feature catalog.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    tables: Arc<TableNames>,
}

impl PlanCatalog {
    /// Creates a catalog over the configured tables.
    #[must_use]
    pub const fn new(tables: Arc<TableNames>) -> Self {
        Self { tables }
    }

    /// Creates a plan.
    pub async fn create_plan<C>(&self, conn: &C, identifier: &str, name: &str) -> Result<Plan, DbErr>
    where
        C: ConnectionTrait,
    {
        let plan = Plan {
            id: PlanId::new().into_inner(),
            identifier: identifier.to_string(),
            name: name.to_string(),
        };

        let insert = Query::insert()
            .into_table(table(&self.tables.plans))
            .columns([Plans::Id, Plans::Identifier, Plans::Name])
            .values_panic([
                plan.id.into(),
                plan.identifier.clone().into(),
                plan.name.clone().into(),
            ])
            .to_owned();
        execute(conn, &insert).await?;

        Ok(plan)
    }

    /// Creates a feature collapsing its daily usage with `aggregator`.
    pub async fn create_feature<C>(
        &self,
        conn: &C,
        identifier: &str,
        name: &str,
        aggregator: Aggregator,
    ) -> Result<Feature, DbErr>
    where
        C: ConnectionTrait,
    {
        let feature = Feature {
            id: FeatureId::new().into_inner(),
            identifier: identifier.to_string(),
            name: name.to_string(),
            aggregator: aggregator.as_str().to_string(),
        };

        let insert = Query::insert()
            .into_table(table(&self.tables.features))
            .columns([
                Features::Id,
                Features::Identifier,
                Features::Name,
                Features::Aggregator,
            ])
            .values_panic([
                feature.id.into(),
                feature.identifier.clone().into(),
                feature.name.clone().into(),
                feature.aggregator.clone().into(),
            ])
            .to_owned();
        execute(conn, &insert).await?;

        Ok(feature)
    }

    /// Adds one tier of `feature` to `plan` (limit None = unlimited).
    pub async fn attach_tier<C>(
        &self,
        conn: &C,
        plan: PlanId,
        feature: FeatureId,
        tier: i32,
        limit: Option<i64>,
    ) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let insert = Query::insert()
            .into_table(table(&self.tables.plan_feature))
            .columns([
                PlanFeature::Id,
                PlanFeature::PlanId,
                PlanFeature::FeatureId,
                PlanFeature::Tier,
                PlanFeature::Limit,
            ])
            .values_panic([
                uuid::Uuid::now_v7().into(),
                plan.into_inner().into(),
                feature.into_inner().into(),
                tier.into(),
                limit.into(),
            ])
            .to_owned();
        execute(conn, &insert).await?;

        Ok(())
    }

    /// Removes every tier of `feature` from `plan`.
    pub async fn detach_feature<C>(
        &self,
        conn: &C,
        plan: PlanId,
        feature: FeatureId,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let delete = Query::delete()
            .from_table(table(&self.tables.plan_feature))
            .and_where(Expr::col(PlanFeature::PlanId).eq(plan.into_inner()))
            .and_where(Expr::col(PlanFeature::FeatureId).eq(feature.into_inner()))
            .to_owned();
        execute(conn, &delete).await
    }

    /// Finds a plan by identifier.
    pub async fn plan_by_identifier<C>(
        &self,
        conn: &C,
        identifier: &str,
    ) -> Result<Option<Plan>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns([Plans::Id, Plans::Identifier, Plans::Name])
            .from(table(&self.tables.plans))
            .and_where(Expr::col(Plans::Identifier).eq(identifier))
            .to_owned();

        Plan::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Finds a plan by ID.
    pub async fn plan_by_id<C>(&self, conn: &C, plan: PlanId) -> Result<Option<Plan>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns([Plans::Id, Plans::Identifier, Plans::Name])
            .from(table(&self.tables.plans))
            .and_where(Expr::col(Plans::Id).eq(plan.into_inner()))
            .to_owned();

        Plan::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Finds a feature by identifier.
    pub async fn feature_by_identifier<C>(
        &self,
        conn: &C,
        identifier: &str,
    ) -> Result<Option<Feature>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns([
                Features::Id,
                Features::Identifier,
                Features::Name,
                Features::Aggregator,
            ])
            .from(table(&self.tables.features))
            .and_where(Expr::col(Features::Identifier).eq(identifier))
            .to_owned();

        Feature::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Tiers of every feature of a plan, highest tier first.
    pub async fn features_of_plan<C>(&self, conn: &C, plan: PlanId) -> Result<Vec<PlanTier>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns([PlanFeature::FeatureId, PlanFeature::Tier, PlanFeature::Limit])
            .from(table(&self.tables.plan_feature))
            .and_where(Expr::col(PlanFeature::PlanId).eq(plan.into_inner()))
            .order_by(PlanFeature::Tier, Order::Desc)
            .order_by(PlanFeature::FeatureId, Order::Asc)
            .to_owned();

        let rows = PlanTierRow::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await?;

        Ok(rows.into_iter().map(PlanTier::from).collect())
    }

    /// Distinct features currently attached to a plan, by identifier.
    pub async fn plan_features<C>(&self, conn: &C, plan: PlanId) -> Result<Vec<Feature>, DbErr>
    where
        C: ConnectionTrait,
    {
        let attached = Query::select()
            .column(PlanFeature::FeatureId)
            .from(table(&self.tables.plan_feature))
            .and_where(Expr::col(PlanFeature::PlanId).eq(plan.into_inner()))
            .to_owned();

        let select = Query::select()
            .columns([
                Features::Id,
                Features::Identifier,
                Features::Name,
                Features::Aggregator,
            ])
            .from(table(&self.tables.features))
            .and_where(Expr::col(Features::Id).in_subquery(attached))
            .order_by(Features::Identifier, Order::Asc)
            .to_owned();

        Feature::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }
}
