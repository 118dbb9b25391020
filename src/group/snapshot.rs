use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ActivityWindow, RiderPosition};

/// Latest in-window report per rider.
///
/// Riders are ordered newest first; equal timestamps are ordered by report id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupSnapshot {
    riders: Vec<RiderPosition>,
}

impl GroupSnapshot {
    pub fn riders(&self) -> &[RiderPosition] {
        &self.riders
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    pub fn get(&self, user_id: Uuid) -> Option<&RiderPosition> {
        self.riders.iter().find(|r| r.user_id == user_id)
    }
}

/// Reduce raw reports to one position per rider.
///
/// Reports older than `now - window` are dropped even if the store already
/// filtered them. When a rider has two reports with the same timestamp the
/// one with the lowest report id wins.
pub fn build_snapshot<I>(reports: I, now: DateTime<Utc>, window: ActivityWindow) -> GroupSnapshot
where
    I: IntoIterator<Item = RiderPosition>,
{
    let cutoff = window.cutoff(now);

    let mut fresh: Vec<RiderPosition> = reports
        .into_iter()
        .filter(|r| r.timestamp >= cutoff)
        .collect();

    fresh.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.report_id.cmp(&b.report_id))
    });

    let mut seen = HashSet::new();
    fresh.retain(|r| seen.insert(r.user_id));

    GroupSnapshot { riders: fresh }
}
