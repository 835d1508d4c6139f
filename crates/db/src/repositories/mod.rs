//! Repository abstractions for data access.
//!
//! Repositories build every statement with `sea_query` from the configured
//! table names and bind all values as parameters. Methods are generic over
//! `ConnectionTrait` so callers decide whether they run on the pool or
//! inside a transaction.

pub mod catalog;
pub mod limit;
pub mod period;
pub mod subscription;
pub mod usage;

pub use catalog::PlanCatalog;
pub use limit::LimitLedger;
pub use period::PeriodRepository;
pub use subscription::SubscriptionRepository;
pub use usage::UsageLedger;

use sea_orm::{ConnectionTrait, DbErr, StatementBuilder};

/// Executes a data-modifying statement and returns the affected row count.
pub(crate) async fn execute<C, S>(conn: &C, statement: &S) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
    S: StatementBuilder,
{
    let statement = conn.get_database_backend().build(statement);
    Ok(conn.execute(statement).await?.rows_affected())
}
