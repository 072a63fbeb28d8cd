//! Scoring and difficulty driver
//!
//! A point is awarded each time the agent's path progress passes an obstacle's
//! path parameter. Density grows in steps of one score bucket.

use super::spawner::Obstacle;
use crate::score_bucket;
use crate::settings::ObstacleSettings;

/// Did moving from `prev` to `new` pass over `p`?
///
/// Progress only moves forward, so `new < prev` means the lap wrapped past 1.0.
/// The interval is half-open: `prev` itself was already counted last tick.
#[inline]
pub fn crossed(prev: f32, new: f32, p: f32) -> bool {
    if new >= prev {
        prev < p && p <= new
    } else {
        p > prev || p <= new
    }
}

/// Ids of the obstacles passed between `prev` and `new`, in collection order
pub fn crossed_obstacles(prev: f32, new: f32, obstacles: &[Obstacle]) -> Vec<u32> {
    if prev == new {
        return Vec::new();
    }
    obstacles
        .iter()
        .filter(|o| crossed(prev, new, o.path_param))
        .map(|o| o.id)
        .collect()
}

/// Points earned by advancing from `prev` to `new`: one per crossed obstacle
pub fn on_progress_advance(prev: f32, new: f32, obstacles: &[Obstacle]) -> u64 {
    crossed_obstacles(prev, new, obstacles).len() as u64
}

/// Obstacle count the spawner works toward at `score`
pub fn target_obstacle_count(score: u64, settings: &ObstacleSettings) -> usize {
    let steps = score_bucket(score).saturating_mul(settings.per_bucket_increment as u64);
    let target = (settings.starting_count as u64).saturating_add(steps);
    target.min(settings.max_count as u64) as usize
}
