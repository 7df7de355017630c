//! Unified activity timeline.

use crate::normalize::normalize_activities;
use ecopoint_core::{ActivityKind, ActivityRecord};
use serde_json::Value;
use std::collections::HashSet;

/// Number of entries kept when no limit is configured.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 5;

/// Merges the deposit, redemption and withdrawal feeds into one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityAggregator {
    limit: usize,
}

impl Default for ActivityAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_LIMIT)
    }
}

impl ActivityAggregator {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Normalize raw payloads and merge them.
    ///
    /// `sources` is concatenated in the order given, which only matters for
    /// id collisions and equal timestamps. Callers pass the feeds in a fixed
    /// order so the result never depends on which request settled first.
    pub fn aggregate(&self, sources: &[(ActivityKind, &Value)]) -> Vec<ActivityRecord> {
        let batches = sources
            .iter()
            .map(|(kind, payload)| normalize_activities(*kind, payload));
        self.merge(batches)
    }

    /// Merge already normalized batches.
    ///
    /// Duplicate ids keep their first occurrence. The sort is stable and
    /// newest first; records without a timestamp sort as the epoch.
    pub fn merge<I>(&self, batches: I) -> Vec<ActivityRecord>
    where
        I: IntoIterator<Item = Vec<ActivityRecord>>,
    {
        let mut seen = HashSet::new();
        let mut merged: Vec<ActivityRecord> = batches
            .into_iter()
            .flatten()
            .filter(|record| seen.insert(record.id.clone()))
            .collect();

        merged.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        merged.truncate(self.limit);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecopoint_test_utils::generators::{arb_activity_kind, arb_raw_activity_list};
    use ecopoint_test_utils::fixtures;
    use proptest::prelude::*;
    use serde_json::json;

    fn ids(records: &[ActivityRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_same_local_id_from_two_sources_does_not_collide() {
        let deposits = json!([{"id": 1, "ts": "2025-01-02"}]);
        let redemptions = json!([{"id": 1, "ts": "2025-01-03"}]);
        let merged = ActivityAggregator::default().aggregate(&[
            (ActivityKind::Deposit, &deposits),
            (ActivityKind::Redemption, &redemptions),
        ]);
        assert_eq!(ids(&merged), vec!["redeem-1", "tabung-1"]);
    }

    #[test]
    fn test_fixture_feeds_are_sorted_newest_first_and_truncated() {
        let deposits = fixtures::deposits_payload()["data"].clone();
        let redemptions = fixtures::redemptions_payload()["data"].clone();
        let withdrawals = fixtures::withdrawals_payload();

        let merged = ActivityAggregator::new(3).aggregate(&[
            (ActivityKind::Deposit, &deposits),
            (ActivityKind::Redemption, &redemptions),
            (ActivityKind::Withdrawal, &withdrawals),
        ]);
        assert_eq!(ids(&merged), vec!["tabung-2", "tarik-1", "redeem-1"]);
        assert_eq!(merged[0].point_delta, 25);
        assert_eq!(merged[1].point_delta, -10);
        assert_eq!(merged[2].point_delta, -30);
    }

    #[test]
    fn test_missing_timestamps_sort_last_in_input_order() {
        let deposits = json!([{"id": "a"}, {"id": "b", "ts": "2025-01-01"}, {"id": "c"}]);
        let merged =
            ActivityAggregator::new(10).aggregate(&[(ActivityKind::Deposit, &deposits)]);
        assert_eq!(ids(&merged), vec!["tabung-b", "tabung-a", "tabung-c"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let deposits = json!([
            {"id": 4, "ts": "2025-01-01", "poin": 1},
            {"id": 4, "ts": "2025-02-01", "poin": 2}
        ]);
        let merged =
            ActivityAggregator::new(10).aggregate(&[(ActivityKind::Deposit, &deposits)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].point_delta, 1);
    }

    #[test]
    fn test_backend_id_never_shadows_a_record_without_id() {
        // A backend id of "n3" next to an id-less record at index 3.
        let deposits = json!([
            {"id": "n3", "ts": "2025-01-01"},
            {"id": 1, "ts": "2025-01-02"},
            {"id": 2, "ts": "2025-01-03"},
            {"ts": "2025-01-04", "poin": 9}
        ]);
        let merged =
            ActivityAggregator::new(10).aggregate(&[(ActivityKind::Deposit, &deposits)]);
        assert_eq!(
            ids(&merged),
            vec!["tabung#3", "tabung-2", "tabung-1", "tabung-n3"]
        );
        assert_eq!(merged[0].point_delta, 9);
    }

    #[test]
    fn test_default_limit() {
        let aggregator = ActivityAggregator::default();
        assert_eq!(aggregator.limit(), DEFAULT_ACTIVITY_LIMIT);

        let deposits = Value::Array(
            (1..=8)
                .map(|i| json!({"id": i, "ts": format!("2025-01-0{}", i)}))
                .collect(),
        );
        let merged = aggregator.aggregate(&[(ActivityKind::Deposit, &deposits)]);
        assert_eq!(merged.len(), aggregator.limit());
        assert_eq!(merged[0].id, "tabung-8");
    }

    #[test]
    fn test_empty_sources() {
        let merged = ActivityAggregator::default().aggregate(&[
            (ActivityKind::Deposit, &Value::Null),
            (ActivityKind::Withdrawal, &json!([])),
        ]);
        assert!(merged.is_empty());
    }

    proptest! {
        #[test]
        fn prop_ids_are_unique_and_within_limit(
            deposits in arb_raw_activity_list(ActivityKind::Deposit),
            redemptions in arb_raw_activity_list(ActivityKind::Redemption),
            withdrawals in arb_raw_activity_list(ActivityKind::Withdrawal),
            limit in 1usize..40,
        ) {
            let (d, r, w) = (json!(deposits), json!(redemptions), json!(withdrawals));
            let merged = ActivityAggregator::new(limit).aggregate(&[
                (ActivityKind::Deposit, &d),
                (ActivityKind::Redemption, &r),
                (ActivityKind::Withdrawal, &w),
            ]);

            prop_assert!(merged.len() <= limit);
            let unique: HashSet<_> = merged.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(unique.len(), merged.len());
            for pair in merged.windows(2) {
                prop_assert!(pair[0].sort_key() >= pair[1].sort_key());
            }
        }

        #[test]
        fn prop_records_without_ids_all_survive(
            kind in arb_activity_kind(),
            count in 1usize..12,
            backend_ids in proptest::collection::vec("[a-z0-9#-]{1,4}", 0..6),
        ) {
            let mut raw: Vec<Value> = backend_ids.iter().map(|id| json!({"id": id})).collect();
            raw.extend((0..count).map(|_| json!({"poin": 1})));
            let merged = ActivityAggregator::new(usize::MAX).aggregate(&[(kind, &json!(raw))]);

            let backend_prefix = format!("{}-", kind.source_tag());
            let synthetic = merged
                .iter()
                .filter(|r| !r.id.starts_with(&backend_prefix))
                .count();
            prop_assert_eq!(synthetic, count);
            prop_assert!(merged.iter().all(|r| r.kind == kind));
        }

        #[test]
        fn prop_order_of_merged_timestamps_ignores_source_order(
            deposits in arb_raw_activity_list(ActivityKind::Deposit),
            withdrawals in arb_raw_activity_list(ActivityKind::Withdrawal),
        ) {
            let (d, w) = (json!(deposits), json!(withdrawals));
            let aggregator = ActivityAggregator::new(usize::MAX);
            let forward = aggregator.aggregate(&[
                (ActivityKind::Deposit, &d),
                (ActivityKind::Withdrawal, &w),
            ]);
            let backward = aggregator.aggregate(&[
                (ActivityKind::Withdrawal, &w),
                (ActivityKind::Deposit, &d),
            ]);

            // Source tags keep ids disjoint, so both orders hold the same
            // records and agree on the timestamp sequence.
            let keys = |records: &[ActivityRecord]| {
                records.iter().map(|r| r.sort_key()).collect::<Vec<_>>()
            };
            prop_assert_eq!(keys(&forward), keys(&backward));
            prop_assert_eq!(forward.len(), backward.len());
        }
    }
}
