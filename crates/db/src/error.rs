//! Error types for ledger and lifecycle operations.

use sea_orm::DbErr;
use thiserror::Error;
use throttle_core::ParseValueError;
use throttle_shared::types::{SubscriptionId, UserId};

/// Result type alias using `ThrottleError`.
pub type ThrottleResult<T> = Result<T, ThrottleError>;

/// Error types for Throttle operations.
///
/// Every persistence failure surfaces as `Internal`, whatever its cause.
/// Callers must treat it as "the operation did not take effect".
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// Persistence failure (connection loss, constraint violation, timeout).
    #[error("Internal error: {0}")]
    Internal(#[from] DbErr),

    /// No plan carries the given identifier.
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// No feature carries the given identifier.
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    /// No subscription with the given ID.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    /// The user has no active subscription.
    #[error("User {0} has no active subscription")]
    NotSubscribed(UserId),

    /// A stored code could not be decoded.
    #[error("Invalid stored value: {0}")]
    InvalidStoredValue(#[from] ParseValueError),
}

impl ThrottleError {
    /// Returns the error code for callers that report errors by code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Internal(_) | Self::InvalidStoredValue(_) => "INTERNAL_ERROR",
            Self::PlanNotFound(_) => "PLAN_NOT_FOUND",
            Self::FeatureNotFound(_) => "FEATURE_NOT_FOUND",
            Self::SubscriptionNotFound(_) => "SUBSCRIPTION_NOT_FOUND",
            Self::NotSubscribed(_) => "NOT_SUBSCRIBED",
        }
    }
}
