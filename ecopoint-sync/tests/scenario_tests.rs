//! End-to-end behaviour of the public surface, one test per user-visible flow.

mod support;

use chrono::NaiveDate;
use ecopoint_cache::TtlCache;
use ecopoint_core::{ActivityKind, UserId};
use ecopoint_sync::{compute_season_window, ActivityAggregator, SectionState, SyncConfig};
use ecopoint_test_utils::fixtures::{self, dashboard_transport};
use ecopoint_test_utils::generators::arb_user_id;
use ecopoint_test_utils::Script;
use proptest::prelude::*;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use support::Harness;

#[test]
fn cached_stats_are_readable_immediately() {
    let cache: TtlCache = TtlCache::new(Arc::new(fixtures::manual_clock()));
    cache.set("stats-7", json!({"poin": 100}), Duration::from_millis(120_000));
    assert_eq!(cache.get("stats-7"), Some(json!({"poin": 100})));
}

#[tokio::test(start_paused = true)]
async fn dashboard_with_one_rejected_endpoint_still_renders() {
    let me = UserId::from(7i64);
    let transport = dashboard_transport(&me)
        .with_script("/users/7/badges", Script::connection_error("connection reset"));
    let harness = Harness::new(transport);

    let dashboard = harness
        .service
        .fetch_dashboard(Some(&me), false)
        .await
        .expect("partial failure is not an error");

    assert_eq!(dashboard.stats.data.points, 100);
    assert!(!dashboard.leaderboard.data.is_empty());
    assert_eq!(dashboard.badges.state, SectionState::Unavailable);
    assert!(dashboard.badges.data.is_empty());
}

#[test]
fn mid_may_falls_in_the_second_quarter() {
    let reference = NaiveDate::from_ymd_opt(2025, 5, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let window = compute_season_window(reference);
    assert_eq!(window.quarter_index, 2);
    assert_eq!(window.start.to_string(), "2025-04-01");
    assert_eq!(
        window.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "2025-06-30T23:59:59"
    );
}

#[test]
fn deposits_and_redemptions_merge_newest_first() {
    let deposits = json!([{"id": 1, "ts": "2025-01-02"}]);
    let redemptions = json!([{"id": 1, "ts": "2025-01-03"}]);

    let merged = ActivityAggregator::default().aggregate(&[
        (ActivityKind::Deposit, &deposits),
        (ActivityKind::Redemption, &redemptions),
    ]);

    let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["redeem-1", "tabung-1"]);
    assert!(merged[0].timestamp > merged[1].timestamp);
}

#[test]
fn repeated_scope_check_for_same_user_keeps_entries() {
    let cache: TtlCache = TtlCache::new(Arc::new(fixtures::manual_clock()));
    let user = UserId::from(5i64);

    assert!(!cache.clear_user_scoped(&user));
    cache.set("stats-5", json!({"poin": 1}), Duration::from_secs(60));
    cache.set("badges-5", json!([]), Duration::from_secs(60));

    assert!(!cache.clear_user_scoped(&user));
    assert_eq!(cache.get("stats-5"), Some(json!({"poin": 1})));
    assert_eq!(cache.get("badges-5"), Some(json!([])));

    assert!(cache.clear_user_scoped(&UserId::from("5b")));
    assert!(cache.is_empty());
}

proptest! {
    #[test]
    fn user_switch_purges_exactly_when_the_user_changes(
        first in arb_user_id(),
        second in arb_user_id(),
    ) {
        let cache: TtlCache = TtlCache::new(Arc::new(fixtures::manual_clock()));
        cache.clear_user_scoped(&first);
        cache.set(format!("stats-{}", first), json!({"poin": 1}), Duration::from_secs(60));

        let purged = cache.clear_user_scoped(&second);
        prop_assert_eq!(purged, first != second);
        prop_assert_eq!(cache.is_empty(), first != second);
        prop_assert_eq!(cache.last_user_id(), Some(second));
    }
}

#[test]
fn config_file_round_trip_through_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(support::TEST_CONFIG.as_bytes())
        .expect("write config");

    let config = SyncConfig::from_path(file.path()).expect("config loads");
    assert_eq!(config.activity_limit, 5);
    assert_eq!(config.auth.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.resources.leaderboard.ttl(), Duration::from_secs(60));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = SyncConfig::from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ecopoint_sync::ConfigError::Io(_))));
}
