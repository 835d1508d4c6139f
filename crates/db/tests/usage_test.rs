//! Integration tests for the usage ledger.
//!
//! Tests verify lazy row creation, the high-water-mark refresh, and period
//! aggregation per feature aggregator.

mod common;

use common::{days_ago, setup, subscribe, today, user};
use rstest::rstest;
use throttle_core::{ActiveSubscriptionPeriod, Aggregator, CalendarMonthPeriod, Period};
use throttle_db::ThrottleError;
use throttle_shared::types::SubscriptionId;

#[tokio::test]
async fn test_increment_zero_creates_no_row() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();
    let ledger = throttle.usage();
    let yesterday = days_ago(1);

    ledger
        .increment(throttle.db(), id, catalog.api_calls.feature_id(), 0, yesterday)
        .await
        .expect("increment");

    let row = ledger
        .usage_on(throttle.db(), id, catalog.api_calls.feature_id(), yesterday)
        .await
        .expect("query");
    assert!(row.is_none());
}

#[tokio::test]
async fn test_increment_creates_row_lazily_then_updates() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();
    let ledger = throttle.usage();
    let feature = catalog.api_calls.feature_id();
    let yesterday = days_ago(1);

    ledger
        .increment(throttle.db(), id, feature, 5, yesterday)
        .await
        .expect("increment");
    ledger
        .increment(throttle.db(), id, feature, 3, yesterday)
        .await
        .expect("increment");

    let row = ledger
        .usage_on(throttle.db(), id, feature, yesterday)
        .await
        .expect("query")
        .expect("row");
    assert_eq!(row.used_quantity, 8);

    let rows = ledger.history(throttle.db(), id).await.expect("history");
    assert_eq!(
        rows.iter()
            .filter(|r| r.feature_id == catalog.api_calls.id && r.date == yesterday)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_increment_accumulates_today() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();

    throttle.increment(id, "api_calls", 5).await.expect("increment");
    throttle.increment(id, "api_calls", 3).await.expect("increment");

    let row = throttle
        .usage()
        .usage_on(throttle.db(), id, catalog.api_calls.feature_id(), today())
        .await
        .expect("query")
        .expect("row");
    assert_eq!(row.used_quantity, 8);
}

#[tokio::test]
async fn test_refresh_never_lowers_usage() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();

    throttle
        .refresh_usage(id, "seats", 10, None)
        .await
        .expect("refresh");
    throttle
        .refresh_usage(id, "seats", 4, None)
        .await
        .expect("refresh");

    let row = throttle
        .usage()
        .usage_on(throttle.db(), id, catalog.seats.feature_id(), today())
        .await
        .expect("query")
        .expect("row");
    assert_eq!(row.used_quantity, 10);
}

#[tokio::test]
async fn test_refresh_creates_missing_day() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();
    let day = days_ago(3);

    throttle
        .refresh_usage(id, "seats", 2, Some(day))
        .await
        .expect("refresh");
    throttle
        .refresh_usage(id, "seats", 2, Some(day))
        .await
        .expect("refresh");

    let rows = throttle.usage().history(throttle.db(), id).await.expect("history");
    let on_day: Vec<_> = rows
        .iter()
        .filter(|r| r.feature_id == catalog.seats.id && r.date == day)
        .collect();
    assert_eq!(on_day.len(), 1);
    assert_eq!(on_day[0].used_quantity, 2);
}

#[rstest]
#[case::zero(0)]
#[case::negative(-3)]
#[tokio::test]
async fn test_refresh_without_positive_count_leaves_missing_day_empty(#[case] count: i64) {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();
    let day = days_ago(4);

    throttle
        .refresh_usage(id, "seats", count, Some(day))
        .await
        .expect("refresh");

    let row = throttle
        .usage()
        .usage_on(throttle.db(), id, catalog.seats.feature_id(), day)
        .await
        .expect("query");
    assert!(row.is_none());
}

#[tokio::test]
async fn test_aggregate_applies_each_feature_aggregator() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();
    let ledger = throttle.usage();
    let api_calls = catalog.api_calls.feature_id();
    let seats = catalog.seats.feature_id();

    for (days, calls, peak) in [(2, 10, 2), (1, 20, 3)] {
        let date = days_ago(days);
        ledger
            .increment(throttle.db(), id, api_calls, calls, date)
            .await
            .expect("increment");
        ledger
            .refresh_usage(throttle.db(), id, seats, peak, date)
            .await
            .expect("refresh");
    }
    throttle.increment(id, "api_calls", 5).await.expect("increment");
    throttle.refresh_usage(id, "seats", 1, None).await.expect("refresh");

    let totals = throttle.get_usage(id, days_ago(2), None).await.expect("usage");
    assert_eq!(totals.len(), 2);

    let calls = totals
        .iter()
        .find(|t| t.identifier == "api_calls")
        .expect("api_calls total");
    assert_eq!(calls.aggregator, Aggregator::Sum);
    assert_eq!(calls.used_quantity, 35);

    let peak = totals
        .iter()
        .find(|t| t.identifier == "seats")
        .expect("seats total");
    assert_eq!(peak.aggregator, Aggregator::Max);
    assert_eq!(peak.used_quantity, 3);

    let recent = throttle
        .get_usage(id, days_ago(1), Some(days_ago(1)))
        .await
        .expect("usage");
    let calls = recent
        .iter()
        .find(|t| t.identifier == "api_calls")
        .expect("api_calls total");
    assert_eq!(calls.used_quantity, 20);
}

#[tokio::test]
async fn test_aggregate_skips_features_detached_from_plan() {
    let (throttle, catalog) = setup().await;
    let id = subscribe(&throttle, "basic").await.subscription_id();
    throttle.increment(id, "seats", 2).await.expect("increment");

    throttle
        .catalog()
        .detach_feature(
            throttle.db(),
            catalog.basic.plan_id(),
            catalog.seats.feature_id(),
        )
        .await
        .expect("detach");

    let totals = throttle.get_usage(id, today(), None).await.expect("usage");
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].identifier, "api_calls");
}

#[tokio::test]
async fn test_aggregate_reports_zero_for_untouched_features() {
    let (throttle, _) = setup().await;
    let id = subscribe(&throttle, "pro").await.subscription_id();

    let totals = throttle.get_usage(id, days_ago(30), None).await.expect("usage");
    assert_eq!(totals.len(), 2);
    assert!(totals.iter().all(|t| t.used_quantity == 0));
}

#[tokio::test]
async fn test_usage_of_user_over_subscription_period() {
    let (throttle, _) = setup().await;
    let user = user(42);
    let subscription = throttle.subscribe(user, "basic").await.expect("subscribe");
    throttle
        .increment(subscription.subscription_id(), "api_calls", 12)
        .await
        .expect("increment");

    let period = ActiveSubscriptionPeriod::current(subscription.subscribed_on());
    assert_eq!(period.start(), today());

    let totals = throttle.usage_of_user(user, &period).await.expect("usage");
    let calls = totals
        .iter()
        .find(|t| t.identifier == "api_calls")
        .expect("api_calls total");
    assert_eq!(calls.used_quantity, 12);
}

#[tokio::test]
async fn test_usage_errors() {
    let (throttle, _) = setup().await;

    let err = throttle
        .usage_of_user(user(404), &CalendarMonthPeriod::current())
        .await
        .expect_err("not subscribed");
    assert!(matches!(err, ThrottleError::NotSubscribed(u) if u == user(404)));

    let err = throttle
        .get_usage(SubscriptionId::new(), today(), None)
        .await
        .expect_err("unknown subscription");
    assert_eq!(err.error_code(), "SUBSCRIPTION_NOT_FOUND");

    let id = subscribe(&throttle, "basic").await.subscription_id();
    let err = throttle
        .increment(id, "gpu_minutes", 1)
        .await
        .expect_err("unknown feature");
    assert!(matches!(err, ThrottleError::FeatureNotFound(ref f) if f == "gpu_minutes"));
}
