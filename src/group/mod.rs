//! Group status: which two active riders are currently farthest apart.
//!
//! The computation is split into a snapshot step (latest report per rider
//! inside the activity window) and a pair step (exhaustive farthest-pair
//! scan). Both are pure functions of their inputs, so the HTTP layer only
//! has to fetch reports and pick the clock.

pub mod pair;
pub mod snapshot;
pub mod status;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::location;
use crate::utils::geo::haversine_distance;

pub use pair::{farthest_pair, RiderPair};
pub use snapshot::{build_snapshot, GroupSnapshot};
pub use status::{compute_status, GroupStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("Not enough riders: {found} active in the window, at least 2 required")]
    InsufficientRiders { found: usize },
}

/// A rider's reported position, detached from the storage model.
#[derive(Debug, Clone, PartialEq)]
pub struct RiderPosition {
    pub report_id: i32,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl RiderPosition {
    pub fn distance_to(&self, other: &RiderPosition) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl From<location::Model> for RiderPosition {
    fn from(report: location::Model) -> Self {
        Self {
            report_id: report.id,
            user_id: report.user_id,
            latitude: report.latitude,
            longitude: report.longitude,
            timestamp: report.timestamp.with_timezone(&Utc),
        }
    }
}

/// How far back a report still counts as current. Between one hour and one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    hours: i64,
}

impl ActivityWindow {
    pub const DEFAULT_HOURS: i64 = 24;
    /// Keeps the cutoff inside every backend's timestamp range.
    pub const MAX_HOURS: i64 = 24 * 366;

    /// Returns `None` for non-positive durations and anything above [`Self::MAX_HOURS`].
    pub fn from_hours(hours: i64) -> Option<Self> {
        (1..=Self::MAX_HOURS)
            .contains(&hours)
            .then_some(Self { hours })
    }

    pub fn hours(&self) -> i64 {
        self.hours
    }

    /// Oldest timestamp still inside the window ending at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::try_hours(self.hours)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for ActivityWindow {
    fn default() -> Self {
        Self {
            hours: Self::DEFAULT_HOURS,
        }
    }
}
