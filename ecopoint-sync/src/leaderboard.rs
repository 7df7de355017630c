//! Read-side leaderboard ranking.

use crate::season::period_bounds;
use ecopoint_core::{LeaderboardEntry, LeaderboardRow, PeriodSelector, SeasonWindow, UserId};

/// Filter `rows` to `period` and rank them by points.
///
/// A row is kept when its last activity, in the window's local time, falls
/// inside the period bounds. Rows without an activity timestamp are kept only
/// for [`PeriodSelector::All`]. Ranking is a stable sort by points descending,
/// so equal scores keep their backend order; ranks are 1-based positions.
/// The row whose user id equals `current_user` is flagged.
pub fn rank_leaderboard(
    rows: &[LeaderboardRow],
    window: &SeasonWindow,
    period: PeriodSelector,
    current_user: Option<&UserId>,
) -> Vec<LeaderboardEntry> {
    let bounds = period_bounds(window, period);
    let mut kept: Vec<&LeaderboardRow> = rows
        .iter()
        .filter(|row| match bounds {
            None => true,
            Some(bounds) => row
                .last_activity
                .is_some_and(|ts| bounds.contains(window.to_local(ts))),
        })
        .collect();

    kept.sort_by(|a, b| b.points.cmp(&a.points));

    kept.into_iter()
        .enumerate()
        .map(|(position, row)| LeaderboardEntry {
            user_id: row.user_id.clone(),
            name: row.name.clone(),
            points: row.points,
            rank: u32::try_from(position + 1).unwrap_or(u32::MAX),
            is_current_user: current_user == Some(&row.user_id),
        })
        .collect()
}
