//! Shared setup for the ledger integration tests.
//!
//! Every test gets its own in-memory SQLite database. The pool holds exactly
//! one connection, since each SQLite memory connection is a separate database.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use sea_orm::{ConnectOptions, Database};
use throttle_core::Aggregator;
use throttle_db::Throttle;
use throttle_db::models::{Feature, Plan, Subscription};
use throttle_db::schema::install;
use throttle_shared::TableNames;
use throttle_shared::types::UserId;
use uuid::Uuid;

/// Demo catalog seeded into every test database.
///
/// - `basic`: api_calls 100, seats 3
/// - `pro`: api_calls 1000 + 500, seats 10 + unlimited
pub struct Catalog {
    pub basic: Plan,
    pub pro: Plan,
    pub api_calls: Feature,
    pub seats: Feature,
    pub storage: Feature,
}

/// Creates a fresh database with the schema and the demo catalog.
pub async fn setup() -> (Throttle, Catalog) {
    setup_with_tables(TableNames::default()).await
}

/// Same as [`setup`] with custom table names.
pub async fn setup_with_tables(tables: TableNames) -> (Throttle, Catalog) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect");

    install(&db, &tables).await.expect("Failed to install schema");

    let throttle = Throttle::new(db, Arc::new(tables));
    let catalog = seed_catalog(&throttle).await;
    (throttle, catalog)
}

async fn seed_catalog(throttle: &Throttle) -> Catalog {
    let repo = throttle.catalog();
    let db = throttle.db();

    let api_calls = repo
        .create_feature(db, "api_calls", "API calls", Aggregator::Sum)
        .await
        .expect("Failed to create feature");
    let seats = repo
        .create_feature(db, "seats", "Seats", Aggregator::Max)
        .await
        .expect("Failed to create feature");
    let storage = repo
        .create_feature(db, "storage", "Storage (GB)", Aggregator::Max)
        .await
        .expect("Failed to create feature");

    let basic = repo
        .create_plan(db, "basic", "Basic")
        .await
        .expect("Failed to create plan");
    repo.attach_tier(db, basic.plan_id(), api_calls.feature_id(), 1, Some(100))
        .await
        .expect("Failed to attach tier");
    repo.attach_tier(db, basic.plan_id(), seats.feature_id(), 1, Some(3))
        .await
        .expect("Failed to attach tier");

    let pro = repo
        .create_plan(db, "pro", "Pro")
        .await
        .expect("Failed to create plan");
    repo.attach_tier(db, pro.plan_id(), api_calls.feature_id(), 1, Some(1000))
        .await
        .expect("Failed to attach tier");
    repo.attach_tier(db, pro.plan_id(), api_calls.feature_id(), 2, Some(500))
        .await
        .expect("Failed to attach tier");
    repo.attach_tier(db, pro.plan_id(), seats.feature_id(), 1, Some(10))
        .await
        .expect("Failed to attach tier");
    repo.attach_tier(db, pro.plan_id(), seats.feature_id(), 2, None)
        .await
        .expect("Failed to attach tier");

    Catalog {
        basic,
        pro,
        api_calls,
        seats,
        storage,
    }
}

/// Subscribes a new random user to `plan`.
pub async fn subscribe(throttle: &Throttle, plan: &str) -> Subscription {
    throttle
        .subscribe(UserId::new(), plan)
        .await
        .expect("Failed to subscribe")
}

/// A fixed user ID.
pub fn user(n: u128) -> UserId {
    UserId::from_uuid(Uuid::from_u128(n))
}

/// Today in UTC.
pub fn today() -> NaiveDate {
    throttle_core::period::today()
}

/// `n` days before today.
pub fn days_ago(n: u64) -> NaiveDate {
    today()
        .checked_sub_days(Days::new(n))
        .expect("date in range")
}
