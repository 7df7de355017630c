//! Canonical records produced by the sync layer.

use crate::identity::{Timestamp, UserId};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ACTIVITY
// ============================================================================

/// Kind of point-affecting activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Deposit,
    Redemption,
    Withdrawal,
}

impl ActivityKind {
    /// Prefix used to make record ids unique across sources.
    pub fn source_tag(self) -> &'static str {
        match self {
            Self::Deposit => "tabung",
            Self::Redemption => "redeem",
            Self::Withdrawal => "tarik",
        }
    }

    /// Sign applied to the point magnitude. Deposits earn, everything else spends.
    pub fn point_sign(self) -> i64 {
        match self {
            Self::Deposit => 1,
            Self::Redemption | Self::Withdrawal => -1,
        }
    }
}

/// One entry of the unified activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// `{source_tag}-{original id}`; unique across all sources.
    pub id: String,
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: Option<Timestamp>,
    pub point_delta: i64,
}

impl ActivityRecord {
    /// Sort key; a missing timestamp sorts as the Unix epoch.
    pub fn sort_key(&self) -> Timestamp {
        self.timestamp.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

// ============================================================================
// LEADERBOARD
// ============================================================================

/// Normalized leaderboard row before ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub name: String,
    pub points: i64,
    /// Most recent activity; used to scope the row to a period.
    pub last_activity: Option<Timestamp>,
}

/// Ranked leaderboard entry for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub name: String,
    pub points: i64,
    /// 1-based position after the stable points sort.
    pub rank: u32,
    pub is_current_user: bool,
}

/// Leaderboard period filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodSelector {
    #[default]
    Season,
    Monthly,
    Weekly,
    All,
}

impl PeriodSelector {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Season => "season",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::All => "all",
        }
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "season" => Ok(Self::Season),
            "monthly" | "month" => Ok(Self::Monthly),
            "weekly" | "week" => Ok(Self::Weekly),
            "all" => Ok(Self::All),
            other => Err(format!("unknown leaderboard period: {}", other)),
        }
    }
}

// ============================================================================
// SEASON
// ============================================================================

/// Quarterly ranking window, expressed in local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    /// 1..=4
    pub quarter_index: u8,
    pub year: i32,
    /// First day of the quarter.
    pub start: NaiveDate,
    /// Last instant (23:59:59) of the quarter.
    pub end: NaiveDateTime,
    pub days_remaining: i64,
    pub hours_remaining: i64,
    /// Local instant the window was computed for.
    pub reference: NaiveDateTime,
    /// Offset used to translate UTC timestamps into this window's local time.
    pub utc_offset_secs: i32,
}

impl SeasonWindow {
    pub fn start_instant(&self) -> NaiveDateTime {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default()
    }

    /// Convert a UTC timestamp into this window's local time.
    pub fn to_local(&self, ts: Timestamp) -> NaiveDateTime {
        match FixedOffset::east_opt(self.utc_offset_secs) {
            Some(offset) => ts.with_timezone(&offset).naive_local(),
            None => ts.naive_utc(),
        }
    }

    /// Whether a local instant falls inside `[start, end]`, compared at
    /// whole-second precision.
    pub fn contains(&self, local: NaiveDateTime) -> bool {
        let local = local.trunc_subsecs(0);
        local >= self.start_instant() && local <= self.end
    }

    /// Short label such as `Q2 2025`.
    pub fn label(&self) -> String {
        format!("Q{} {}", self.quarter_index, self.year)
    }
}

// ============================================================================
// DASHBOARD PAYLOADS
// ============================================================================

/// Point summary for the active user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub points: i64,
    pub deposit_count: u64,
    pub total_weight_kg: f64,
}

/// Achievement badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub unlocked: bool,
    pub earned_at: Option<Timestamp>,
}
