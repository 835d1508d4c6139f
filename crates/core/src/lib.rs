//! Core entitlement rules for Throttle.
//!
//! This crate contains pure business logic with ZERO database dependencies.
//! All domain rules of the limit and usage ledgers live here.
//!
//! # Modules
//!
//! - `period` - Billing period providers (calendar month, subscription cycle)
//! - `limit` - Effective limit computation from tiered plan definitions
//! - `usage` - Aggregation of daily usage into period totals
//! - `entitlement` - Whether a further increment fits under a limit
//! - `status` - Status codes of ledger rows

pub mod entitlement;
pub mod error;
pub mod limit;
pub mod period;
pub mod status;
pub mod usage;

#[cfg(test)]
mod limit_props;
#[cfg(test)]
mod usage_props;

pub use entitlement::Entitlement;
pub use error::ParseValueError;
pub use limit::{PlanTier, effective_limits};
pub use period::{ActiveSubscriptionPeriod, BillingPeriod, CalendarMonthPeriod, Period};
pub use status::{LedgerStatus, SupersedeReason};
pub use usage::{Aggregator, DailyUsage, aggregate_usage};
