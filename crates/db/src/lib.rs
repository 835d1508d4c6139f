//! Persistence layer of Throttle.
//!
//! This crate provides:
//! - Schema built from the configured table names
//! - The plan catalog, the limit and usage ledgers, and the period store
//! - The `Throttle` facade running the subscription lifecycle
//! - Database migrations

pub mod error;
pub mod migration;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod service;

pub use error::{ThrottleError, ThrottleResult};
pub use repositories::{
    LimitLedger, PeriodRepository, PlanCatalog, SubscriptionRepository, UsageLedger,
};
pub use service::Throttle;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use throttle_shared::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
