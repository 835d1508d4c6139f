//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Table name overrides.
    #[serde(default)]
    pub tables: TableNames,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Names of the tables backing the ledgers and the catalog.
///
/// Every name defaults to its logical table name, so a partial override only
/// needs to list the tables that differ.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// Subscriptions binding users to plans.
    pub subscriptions: String,
    /// Metered features.
    pub features: String,
    /// Catalog plans.
    pub plans: String,
    /// Tiered limits of each feature within a plan.
    pub plan_feature: String,
    /// Limit ledger.
    pub subscription_feature_limit: String,
    /// Usage ledger.
    pub subscription_feature_usage: String,
    /// Recorded billing periods of subscriptions.
    pub subscription_periods: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            subscriptions: "subscriptions".to_string(),
            features: "features".to_string(),
            plans: "plans".to_string(),
            plan_feature: "plan_feature".to_string(),
            subscription_feature_limit: "subscription_feature_limit".to_string(),
            subscription_feature_usage: "subscription_feature_usage".to_string(),
            subscription_periods: "subscription_periods".to_string(),
        }
    }
}

impl TableNames {
    /// Returns the default names with `prefix` prepended to each of them.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        let defaults = Self::default();
        Self {
            subscriptions: format!("{prefix}{}", defaults.subscriptions),
            features: format!("{prefix}{}", defaults.features),
            plans: format!("{prefix}{}", defaults.plans),
            plan_feature: format!("{prefix}{}", defaults.plan_feature),
            subscription_feature_limit: format!(
                "{prefix}{}",
                defaults.subscription_feature_limit
            ),
            subscription_feature_usage: format!(
                "{prefix}{}",
                defaults.subscription_feature_usage
            ),
            subscription_periods: format!("{prefix}{}", defaults.subscription_periods),
        }
    }

    /// Loads only the table names, falling back to the defaults.
    ///
    /// Used by tooling such as the migrator that has no use for the rest of
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured source is malformed.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = builder()?;
        match config.get::<Self>("tables") {
            Ok(tables) => Ok(tables),
            Err(config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }
}

fn builder() -> Result<config::Config, config::ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

    config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
        .add_source(config::Environment::with_prefix("THROTTLE").separator("__"))
        .build()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        builder()?.try_deserialize()
    }
}
