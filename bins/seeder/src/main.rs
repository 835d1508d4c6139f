//! Demo catalog seeder for Throttle development and testing.
//!
//! Seeds the metered features and two tiered plans. Plans and features that
//! already exist are left untouched, so the seeder can run repeatedly.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use throttle_core::Aggregator;
use throttle_db::models::Feature;
use throttle_db::{PlanCatalog, connect_with};
use throttle_shared::AppConfig;

/// Features: (identifier, name, aggregator).
const FEATURES: [(&str, &str, Aggregator); 3] = [
    ("api_calls", "API calls", Aggregator::Sum),
    ("seats", "Seats", Aggregator::Max),
    ("storage", "Storage (GB)", Aggregator::Max),
];

/// Plan tiers: (plan, feature, tier, limit). A `None` limit is unlimited.
const TIERS: [(&str, &str, i32, Option<i64>); 6] = [
    ("basic", "api_calls", 1, Some(100)),
    ("basic", "seats", 1, Some(3)),
    ("pro", "api_calls", 1, Some(1_000)),
    ("pro", "api_calls", 2, Some(500)),
    ("pro", "seats", 1, Some(10)),
    ("pro", "storage", 1, None),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    println!("Connecting to database...");
    let db = connect_with(&config.database).await?;
    let catalog = PlanCatalog::new(Arc::new(config.tables));

    println!("Seeding features...");
    let mut features = Vec::with_capacity(FEATURES.len());
    for (identifier, name, aggregator) in FEATURES {
        features.push(seed_feature(&db, &catalog, identifier, name, aggregator).await?);
    }

    println!("Seeding plans...");
    seed_plan(&db, &catalog, &features, "basic", "Basic").await?;
    seed_plan(&db, &catalog, &features, "pro", "Pro").await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_feature(
    db: &DatabaseConnection,
    catalog: &PlanCatalog,
    identifier: &str,
    name: &str,
    aggregator: Aggregator,
) -> anyhow::Result<Feature> {
    if let Some(feature) = catalog.feature_by_identifier(db, identifier).await? {
        println!("  Feature {identifier} already exists, skipping...");
        return Ok(feature);
    }

    Ok(catalog.create_feature(db, identifier, name, aggregator).await?)
}

async fn seed_plan(
    db: &DatabaseConnection,
    catalog: &PlanCatalog,
    features: &[Feature],
    identifier: &str,
    name: &str,
) -> anyhow::Result<()> {
    if catalog.plan_by_identifier(db, identifier).await?.is_some() {
        println!("  Plan {identifier} already exists, skipping...");
        return Ok(());
    }

    let plan = catalog.create_plan(db, identifier, name).await?;
    for (_, feature_identifier, tier, limit) in TIERS.iter().filter(|t| t.0 == identifier) {
        let feature = features
            .iter()
            .find(|f| f.identifier == *feature_identifier)
            .ok_or_else(|| anyhow::anyhow!("Unknown feature {feature_identifier}"))?;
        catalog
            .attach_tier(db, plan.plan_id(), feature.feature_id(), *tier, *limit)
            .await?;
    }

    println!("  Plan {identifier} created");
    Ok(())
}
