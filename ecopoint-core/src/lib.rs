//! EcoPoint Core - Shared Types
//!
//! Data structures, the error taxonomy and the ports (clock, transport, session)
//! shared by the cache and sync crates. No network or cache logic lives here.

pub mod clock;
pub mod entities;
pub mod error;
pub mod identity;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::{
    ActivityKind, ActivityRecord, Badge, LeaderboardEntry, LeaderboardRow, PeriodSelector,
    SeasonWindow, UserStats,
};
pub use error::{BatchFailure, DataShapeError, FetchError, SyncError, SyncResult};
pub use identity::{Timestamp, UserId};
pub use transport::{NoopSessionObserver, SessionObserver, Transport, TransportResponse};
