//! Agent vs obstacle collision
//!
//! Both the agent and every obstacle are spheres. Tube walls never need a test:
//! the lateral clamp keeps the agent inside before collisions are checked.

use glam::Vec3;

use super::spawner::Obstacle;
use crate::consts::{GEOM_EPSILON, PUSH_SLOP};

/// Result of resolving the agent against all obstacles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOutcome {
    /// Agent position after push-out
    pub resolved_pos: Vec3,
    /// Whether any obstacle overlapped the agent
    pub collided: bool,
    /// Id of the first overlapping obstacle, in collection order
    pub first_hit: Option<u32>,
}

/// Check a single sphere pair.
///
/// Returns the push that separates the agent, or `None` when they don't touch.
/// Concentric spheres overlap but have no separating direction, so their push
/// is zero.
pub fn sphere_overlap(agent_pos: Vec3, obstacle_pos: Vec3, min_dist: f32) -> Option<Vec3> {
    let to_agent = agent_pos - obstacle_pos;
    let dist = to_agent.length();
    if dist >= min_dist {
        return None;
    }
    if dist > GEOM_EPSILON {
        Some(to_agent / dist * (min_dist - dist + PUSH_SLOP))
    } else {
        Some(Vec3::ZERO)
    }
}

/// Push the agent out of every obstacle it overlaps, in one pass.
///
/// Pushes accumulate: each obstacle is tested against the position already
/// moved by the earlier ones. Any overlap makes the outcome terminal.
pub fn resolve(
    agent_pos: Vec3,
    obstacles: &[Obstacle],
    agent_radius: f32,
    obstacle_radius: f32,
) -> CollisionOutcome {
    let min_dist = agent_radius + obstacle_radius;
    let mut outcome = CollisionOutcome {
        resolved_pos: agent_pos,
        collided: false,
        first_hit: None,
    };
    if min_dist <= 0.0 {
        return outcome;
    }

    for obstacle in obstacles {
        if let Some(push) = sphere_overlap(outcome.resolved_pos, obstacle.position, min_dist) {
            outcome.resolved_pos += push;
            outcome.collided = true;
            outcome.first_hit.get_or_insert(obstacle.id);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn obstacle(id: u32, position: Vec3) -> Obstacle {
        Obstacle {
            id,
            path_param: 0.0,
            radius: 0.0,
            angle: 0.0,
            position,
            orientation: Quat::IDENTITY,
            rotation_axis: Vec3::X,
            rotation_speed: 0.0,
        }
    }

    #[test]
    fn test_no_overlap_no_collision() {
        let obstacles = [obstacle(1, Vec3::new(1.0, 0.0, 0.0))];
        let outcome = resolve(Vec3::ZERO, &obstacles, 0.06, 0.065);
        assert!(!outcome.collided);
        assert_eq!(outcome.resolved_pos, Vec3::ZERO);
        assert_eq!(outcome.first_hit, None);
    }

    #[test]
    fn test_push_out_by_penetration() {
        let obstacles = [obstacle(7, Vec3::new(0.1, 0.0, 0.0))];
        let outcome = resolve(Vec3::ZERO, &obstacles, 0.06, 0.065);
        assert!(outcome.collided);
        assert_eq!(outcome.first_hit, Some(7));
        // Pushed directly away from the obstacle until the spheres just separate
        assert!(outcome.resolved_pos.x < 0.0);
        let separation = outcome.resolved_pos.distance(obstacles[0].position);
        assert!(separation >= 0.125);
        assert!(separation < 0.125 + 1e-3);
    }

    #[test]
    fn test_concentric_overlap_collides_without_push() {
        let obstacles = [obstacle(3, Vec3::new(2.0, 1.0, 0.0))];
        let outcome = resolve(Vec3::new(2.0, 1.0, 0.0), &obstacles, 0.06, 0.065);
        assert!(outcome.collided);
        assert!(outcome.resolved_pos.is_finite());
        assert_eq!(outcome.resolved_pos, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_pushes_accumulate_across_obstacles() {
        let obstacles = [
            obstacle(1, Vec3::new(0.1, 0.0, 0.0)),
            obstacle(2, Vec3::new(0.0, 0.1, 0.0)),
            obstacle(3, Vec3::new(5.0, 0.0, 0.0)),
        ];
        let outcome = resolve(Vec3::ZERO, &obstacles, 0.06, 0.065);
        assert!(outcome.collided);
        assert_eq!(outcome.first_hit, Some(1));
        assert!(outcome.resolved_pos.x < 0.0);
        assert!(outcome.resolved_pos.y < 0.0);
    }

    #[test]
    fn test_zero_radii_never_collide() {
        let obstacles = [obstacle(1, Vec3::ZERO)];
        let outcome = resolve(Vec3::ZERO, &obstacles, 0.0, 0.0);
        assert!(!outcome.collided);
    }
}
