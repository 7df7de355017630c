//! EcoPoint Sync
//!
//! Client-side synchronization for the EcoPoint rewards app: a cache-aware
//! fetch orchestrator, payload normalization, the merged activity timeline,
//! quarterly seasons and leaderboard ranking, and the dashboard service that
//! composes them.

pub mod activity;
pub mod config;
pub mod dashboard;
pub mod envelope;
pub mod error;
pub mod leaderboard;
pub mod normalize;
pub mod orchestrator;
pub mod season;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use activity::{ActivityAggregator, DEFAULT_ACTIVITY_LIMIT};
pub use config::{ConfigError, SyncConfig};
pub use dashboard::{Dashboard, LeaderboardView, Section, SectionState, SyncService};
pub use error::AppError;
pub use leaderboard::rank_leaderboard;
pub use orchestrator::{BatchOutcome, FetchOrchestrator, NamedRequest, Origin, Settled};
pub use season::{
    compute_season_window, compute_season_window_at, period_bounds, PeriodBounds, SeasonTracker,
};
pub use session::LoggingSessionObserver;
pub use transport::RestTransport;
