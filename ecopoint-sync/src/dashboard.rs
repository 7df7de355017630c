//! Dashboard and leaderboard entry points.
//!
//! Each entry point first applies user-scoped invalidation, then runs one
//! orchestrated batch, then normalizes whatever settled. A failed request
//! degrades only its own section.

use crate::activity::ActivityAggregator;
use crate::config::{ResourcePolicy, SyncConfig};
use crate::leaderboard::rank_leaderboard;
use crate::normalize::{normalize_badges, normalize_leaderboard, normalize_stats};
use crate::orchestrator::{BatchOutcome, FetchOrchestrator, NamedRequest, Origin};
use crate::season::SeasonTracker;
use ecopoint_cache::TtlCache;
use ecopoint_core::{
    ActivityKind, ActivityRecord, Badge, Clock, LeaderboardEntry, PeriodSelector, SeasonWindow,
    SessionObserver, SyncResult, Transport, UserId, UserStats,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const STATS: &str = "stats";
const LEADERBOARD: &str = "leaderboard";
const BADGES: &str = "badges";
const ACTIVITY_FEEDS: [(ActivityKind, &str); 3] = [
    (ActivityKind::Deposit, "deposits"),
    (ActivityKind::Redemption, "redemptions"),
    (ActivityKind::Withdrawal, "withdrawals"),
];

/// How a dashboard section was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    /// Fetched from the backend in this call.
    Fresh,
    /// Served entirely from the cache.
    Cached,
    /// Some of the section's sources failed; the rest are shown.
    Partial,
    /// Nothing could be loaded. The section holds its empty default and can
    /// be retried with a forced refresh.
    Unavailable,
}

impl SectionState {
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section<T> {
    pub data: T,
    pub state: SectionState,
}

impl<T: Default> Section<T> {
    fn unavailable() -> Self {
        Self {
            data: T::default(),
            state: SectionState::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub user_id: UserId,
    pub season: SeasonWindow,
    pub stats: Section<UserStats>,
    pub leaderboard: Section<Vec<LeaderboardEntry>>,
    pub badges: Section<Vec<Badge>>,
    pub activities: Section<Vec<ActivityRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardView {
    pub period: PeriodSelector,
    pub season: SeasonWindow,
    pub entries: Vec<LeaderboardEntry>,
    pub state: SectionState,
}

/// Composition of cache, orchestrator, aggregator and season tracker.
pub struct SyncService {
    orchestrator: FetchOrchestrator,
    aggregator: ActivityAggregator,
    season: SeasonTracker,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<TtlCache>,
        session: Arc<dyn SessionObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let season = SeasonTracker::new(
            clock,
            config.season.utc_offset_secs(),
            config.season.refresh_interval(),
        );
        Self {
            orchestrator: FetchOrchestrator::new(transport, cache, session),
            aggregator: ActivityAggregator::new(config.activity_limit),
            season,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        self.orchestrator.cache()
    }

    pub fn season(&self) -> &SeasonTracker {
        &self.season
    }

    /// Load every dashboard section for `user`.
    ///
    /// `None` is the anonymous session, which only loads the leaderboard; the
    /// user-specific sections come back unavailable. Fails only when every
    /// request of the batch failed.
    pub async fn fetch_dashboard(
        &self,
        user: Option<&UserId>,
        force_refresh: bool,
    ) -> SyncResult<Dashboard> {
        let user_id = UserId::from_session(user.cloned());
        self.cache().clear_user_scoped(&user_id);

        let requests = self.dashboard_requests(&user_id);
        let outcome = self.orchestrator.run(&requests, force_refresh).await?;
        let season = self.season.current();

        let stats = section(&outcome, STATS, normalize_stats)
            .unwrap_or_else(Section::unavailable);
        let leaderboard = section(&outcome, LEADERBOARD, |value| {
            let rows = normalize_leaderboard(value);
            rank_leaderboard(&rows, &season, PeriodSelector::All, Some(&user_id))
        })
        .unwrap_or_else(Section::unavailable);
        let badges = section(&outcome, BADGES, normalize_badges)
            .unwrap_or_else(Section::unavailable);
        let activities = if user_id.is_anonymous() {
            Section::unavailable()
        } else {
            self.activities(&outcome)
        };

        tracing::info!(
            user_id = %user_id,
            force_refresh,
            failed = outcome.failures().len(),
            "Dashboard synchronized"
        );

        Ok(Dashboard {
            user_id,
            season,
            stats,
            leaderboard,
            badges,
            activities,
        })
    }

    /// Load and rank the leaderboard for `period`.
    pub async fn fetch_leaderboard(
        &self,
        user: Option<&UserId>,
        period: PeriodSelector,
        force_refresh: bool,
    ) -> SyncResult<LeaderboardView> {
        let user_id = UserId::from_session(user.cloned());
        self.cache().clear_user_scoped(&user_id);

        let request = self.request(
            LEADERBOARD,
            format!("/leaderboard?period={}", period),
            format!("leaderboard-{}", period),
            self.config.resources.leaderboard,
        );
        let outcome = self.orchestrator.run(&[request], force_refresh).await?;
        let season = self.season.current();

        let Section { data, state } = section(&outcome, LEADERBOARD, |value| {
            let rows = normalize_leaderboard(value);
            rank_leaderboard(&rows, &season, period, Some(&user_id))
        })
        .unwrap_or_else(Section::unavailable);

        Ok(LeaderboardView {
            period,
            season,
            entries: data,
            state,
        })
    }

    fn dashboard_requests(&self, user_id: &UserId) -> Vec<NamedRequest> {
        let resources = &self.config.resources;
        let mut requests = vec![self.request(
            LEADERBOARD,
            "/leaderboard".to_string(),
            LEADERBOARD.to_string(),
            resources.leaderboard,
        )];
        if user_id.is_anonymous() {
            return requests;
        }

        requests.push(self.request(
            STATS,
            format!("/users/{}/stats", user_id),
            format!("stats-{}", user_id),
            resources.stats,
        ));
        requests.push(self.request(
            BADGES,
            format!("/users/{}/badges", user_id),
            format!("badges-{}", user_id),
            resources.badges,
        ));
        for (_, feed) in ACTIVITY_FEEDS {
            requests.push(self.request(
                feed,
                format!("/users/{}/{}", user_id, feed),
                format!("{}-{}", feed, user_id),
                resources.activity,
            ));
        }
        requests
    }

    fn request(
        &self,
        name: &str,
        endpoint: String,
        cache_key: String,
        policy: ResourcePolicy,
    ) -> NamedRequest {
        NamedRequest::new(name, endpoint, cache_key)
            .with_timeout(policy.timeout())
            .with_ttl(policy.ttl())
    }

    /// Merge the three activity feeds. The feeds are always passed in the
    /// same order, independent of which request settled first.
    fn activities(&self, outcome: &BatchOutcome) -> Section<Vec<ActivityRecord>> {
        let settled: Vec<(ActivityKind, &Value)> = ACTIVITY_FEEDS
            .iter()
            .filter_map(|(kind, feed)| outcome.value(feed).map(|value| (*kind, value)))
            .collect();
        if settled.is_empty() {
            return Section::unavailable();
        }

        let state = if settled.len() < ACTIVITY_FEEDS.len() {
            SectionState::Partial
        } else if ACTIVITY_FEEDS
            .iter()
            .all(|(_, feed)| outcome.origin(feed) == Some(Origin::Cache))
        {
            SectionState::Cached
        } else {
            SectionState::Fresh
        };

        Section {
            data: self.aggregator.aggregate(&settled),
            state,
        }
    }
}

/// Normalize the payload of request `name`, or `None` if it did not settle.
fn section<T, F>(outcome: &BatchOutcome, name: &str, normalize: F) -> Option<Section<T>>
where
    F: FnOnce(&Value) -> T,
{
    let settled = outcome.get(name)?;
    let state = match settled.origin {
        Origin::Cache => SectionState::Cached,
        Origin::Network => SectionState::Fresh,
    };
    Some(Section {
        data: normalize(&settled.value),
        state,
    })
}
