use chrono::{DateTime, Utc};

use super::{build_snapshot, farthest_pair, ActivityWindow, GroupError, RiderPair, RiderPosition};

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStatus {
    pub total_riders: usize,
    pub pair: RiderPair,
    /// When the computation ran, not when any rider reported.
    pub computed_at: DateTime<Utc>,
}

/// Snapshot the reports at `now` and resolve the farthest pair.
pub fn compute_status<I>(
    reports: I,
    now: DateTime<Utc>,
    window: ActivityWindow,
) -> Result<GroupStatus, GroupError>
where
    I: IntoIterator<Item = RiderPosition>,
{
    let snapshot = build_snapshot(reports, now, window);
    let pair = farthest_pair(snapshot.riders())?;

    Ok(GroupStatus {
        total_riders: snapshot.len(),
        pair,
        computed_at: now,
    })
}
