use super::{GroupError, RiderPosition};

/// The two riders farthest apart. `front` is the rider evaluated first.
#[derive(Debug, Clone, PartialEq)]
pub struct RiderPair {
    pub front: RiderPosition,
    pub back: RiderPosition,
    pub distance_meters: f64,
}

impl RiderPair {
    /// Distance rounded to centimeters for presentation.
    pub fn rounded_distance(&self) -> f64 {
        (self.distance_meters * 100.0).round() / 100.0
    }
}

/// Exhaustive pairwise scan over `riders`.
///
/// O(n²) in the number of active riders, which stays in the tens for one
/// group. A later pair replaces the current best only when strictly farther,
/// so among equal distances the first evaluated pair wins.
pub fn farthest_pair(riders: &[RiderPosition]) -> Result<RiderPair, GroupError> {
    let mut best: Option<(usize, usize, f64)> = None;

    for i in 0..riders.len() {
        for j in (i + 1)..riders.len() {
            let distance = riders[i].distance_to(&riders[j]);
            if best.is_none_or(|(_, _, max)| distance > max) {
                best = Some((i, j, distance));
            }
        }
    }

    let Some((i, j, distance_meters)) = best else {
        return Err(GroupError::InsufficientRiders {
            found: riders.len(),
        });
    };

    Ok(RiderPair {
        front: riders[i].clone(),
        back: riders[j].clone(),
        distance_meters,
    })
}
