//! Quarterly season windows and the period bounds derived from them.

use chrono::{Datelike, Duration as TimeDelta, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound};
use ecopoint_core::{Clock, PeriodSelector, SeasonWindow, Timestamp};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MILLIS_PER_DAY: i64 = 86_400_000;
const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Default interval between season recomputations.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3_600);

/// Inclusive local-time bounds of a leaderboard period.
///
/// Bounds have whole-second precision. An instant is compared by its whole
/// second, so `23:59:59.5` still belongs to a period ending at `23:59:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodBounds {
    pub fn contains(&self, local: NaiveDateTime) -> bool {
        let local = local.trunc_subsecs(0);
        local >= self.start && local <= self.end
    }
}

/// Compute the season containing `reference`, a local wall-clock instant.
///
/// Quarters start on January, April, July and October 1st and end at
/// 23:59:59 on the last day of their third month.
pub fn compute_season_window(reference: NaiveDateTime) -> SeasonWindow {
    window_for(reference, 0)
}

/// Compute the season containing `now`, seen at `utc_offset_secs` east of UTC.
pub fn compute_season_window_at(now: Timestamp, utc_offset_secs: i32) -> SeasonWindow {
    let local = match FixedOffset::east_opt(utc_offset_secs) {
        Some(offset) => now.with_timezone(&offset).naive_local(),
        None => now.naive_utc(),
    };
    window_for(local, utc_offset_secs)
}

fn window_for(reference: NaiveDateTime, utc_offset_secs: i32) -> SeasonWindow {
    let year = reference.year();
    let quarter_index = (reference.month0() / 3 + 1) as u8;
    let first_month = u32::from(quarter_index - 1) * 3 + 1;

    let start = first_of_month(year, first_month);
    let end = end_of_day(last_of_month(year, first_month + 2));
    let (days_remaining, hours_remaining) = remaining(reference, end);

    SeasonWindow {
        quarter_index,
        year,
        start,
        end,
        days_remaining,
        hours_remaining,
        reference,
        utc_offset_secs,
    }
}

/// Whole days (rounded up) and leftover hours (rounded down) until `end`.
fn remaining(reference: NaiveDateTime, end: NaiveDateTime) -> (i64, i64) {
    let millis = (end - reference).num_milliseconds();
    if millis <= 0 {
        return (0, 0);
    }
    let days = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    let hours = (millis % MILLIS_PER_DAY) / MILLIS_PER_HOUR;
    (days, hours)
}

/// Local bounds of `period`, anchored at the window's reference instant.
/// `All` has no bounds.
pub fn period_bounds(window: &SeasonWindow, period: PeriodSelector) -> Option<PeriodBounds> {
    let reference = window.reference.date();
    match period {
        PeriodSelector::Season => Some(PeriodBounds {
            start: window.start_instant(),
            end: window.end,
        }),
        PeriodSelector::Monthly => Some(PeriodBounds {
            start: start_of_day(first_of_month(reference.year(), reference.month())),
            end: end_of_day(last_of_month(reference.year(), reference.month())),
        }),
        PeriodSelector::Weekly => {
            let monday = reference
                - TimeDelta::days(i64::from(reference.weekday().num_days_from_monday()));
            Some(PeriodBounds {
                start: start_of_day(monday),
                end: end_of_day(monday + TimeDelta::days(6)),
            })
        }
        PeriodSelector::All => None,
    }
}

// Dates below are only out of range at the edges of chrono's calendar.

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

fn last_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    first_of_month(next_year, next_month)
        .pred_opt()
        .unwrap_or_default()
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Holds the current season window and recomputes it on an interval.
///
/// Reading the window never recomputes it unless the interval has elapsed,
/// so ranks and boundaries stay put between refreshes.
#[derive(Debug)]
pub struct SeasonTracker {
    clock: Arc<dyn Clock>,
    utc_offset_secs: i32,
    refresh_interval: Duration,
    state: Mutex<Option<(Timestamp, SeasonWindow)>>,
}

impl SeasonTracker {
    pub fn new(clock: Arc<dyn Clock>, utc_offset_secs: i32, refresh_interval: Duration) -> Self {
        Self {
            clock,
            utc_offset_secs,
            refresh_interval,
            state: Mutex::new(None),
        }
    }

    /// The current window, recomputed if it is older than the refresh interval.
    pub fn current(&self) -> SeasonWindow {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((computed_at, window)) = state.as_ref() {
            let age = (now - *computed_at).to_std().unwrap_or(Duration::ZERO);
            if age < self.refresh_interval {
                return window.clone();
            }
        }
        let window = compute_season_window_at(now, self.utc_offset_secs);
        tracing::debug!(
            season = %window.label(),
            days_remaining = window.days_remaining,
            hours_remaining = window.hours_remaining,
            "Season window recomputed"
        );
        *state = Some((now, window.clone()));
        window
    }

    /// Recompute immediately regardless of the interval.
    pub fn recompute(&self) -> SeasonWindow {
        let now = self.clock.now();
        let window = compute_season_window_at(now, self.utc_offset_secs);
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some((now, window.clone()));
        window
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}
