//! Throttle usage report.
//!
//! Prints what a user consumed of each feature of their plan during the
//! current cycle of their active subscription.
//!
//! Usage: throttle-usage --user <uuid> [--json]

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use throttle_core::{ActiveSubscriptionPeriod, Period};
use throttle_db::models::FeatureUsageTotal;
use throttle_db::{Throttle, connect_with};
use throttle_shared::AppConfig;
use throttle_shared::types::UserId;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "throttle-usage")]
#[command(version)]
#[command(about = "Print the usage of a user's active subscription", long_about = None)]
struct Cli {
    /// Subscriber ID
    #[arg(short, long)]
    user: UserId,

    /// Print the report as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    user_id: UserId,
    plan: String,
    period_start: String,
    period_end: String,
    features: &'a [FeatureUsageTotal],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "throttle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let db = connect_with(&config.database).await?;
    info!("Connected to database");
    let throttle = Throttle::new(db, Arc::new(config.tables));

    let subscription = throttle
        .subscription(cli.user)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User {} has no active subscription", cli.user))?;
    let plan = throttle
        .catalog()
        .plan_by_id(throttle.db(), subscription.plan())
        .await?
        .map_or_else(|| subscription.plan().to_string(), |plan| plan.identifier);
    let period = ActiveSubscriptionPeriod::current(subscription.subscribed_on());
    let features = throttle.usage_of_user(cli.user, &period).await?;

    let report = Report {
        user_id: cli.user,
        plan,
        period_start: period.start_formatted(),
        period_end: period.end_formatted(),
        features: &features,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }

    Ok(())
}

fn print_table(report: &Report<'_>) {
    println!(
        "Usage of {} on {} from {} to {}",
        report.user_id, report.plan, report.period_start, report.period_end
    );
    println!("{:<24} {:<10} {:>12}", "FEATURE", "AGGREGATE", "USED");
    for feature in report.features {
        println!(
            "{:<24} {:<10} {:>12}",
            feature.identifier, feature.aggregator, feature.used_quantity
        );
    }
}
