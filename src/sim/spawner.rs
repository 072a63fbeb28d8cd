//! Obstacle placement
//!
//! Obstacles are cubes approximated by their circumscribed sphere. Each one is
//! dropped at a random path parameter away from the agent and at a uniformly
//! distributed point of the cross-section disk that keeps the sphere inside the
//! tube's inradius.

use glam::{Quat, Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::path::{CrossSectionFrame, Path};
use crate::settings::ObstacleSettings;
use crate::{polar_to_cartesian, wrapped_distance};

/// A tumbling obstacle fixed to one spot of the tube
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    /// Path parameter of the obstacle's cross-section, in [0, 1)
    pub path_param: f32,
    /// Distance from the path centerline
    pub radius: f32,
    /// Polar angle inside the cross-section
    pub angle: f32,
    /// World-space center
    pub position: Vec3,
    /// Local +Z starts aligned with the path tangent
    pub orientation: Quat,
    /// Unit tumble axis (local space)
    pub rotation_axis: Vec3,
    /// Signed tumble speed, radians per second
    pub rotation_speed: f32,
}

impl Obstacle {
    /// Place an obstacle at `path_param`, `offset` from the centerline in the
    /// cross-section frame (x along the frame normal, y along the binormal)
    pub fn at<P: Path + ?Sized>(id: u32, path: &P, path_param: f32, offset: Vec2) -> Self {
        let tangent = path.tangent_at(path_param);
        let frame = CrossSectionFrame::from_tangent(tangent);
        Self {
            id,
            path_param,
            radius: offset.length(),
            angle: offset.y.atan2(offset.x),
            position: path.point_at(path_param) + frame.offset(offset),
            orientation: Quat::from_rotation_arc(Vec3::Z, frame.tangent),
            rotation_axis: frame.normal,
            rotation_speed: 0.0,
        }
    }

    /// Offset from the centerline in the cross-section frame
    pub fn cross_section_offset(&self) -> Vec2 {
        polar_to_cartesian(self.radius, self.angle)
    }

    /// Pull the obstacle toward the centerline so its offset is at most `max_r`.
    /// Returns whether it moved.
    pub fn clamp_radius<P: Path + ?Sized>(&mut self, path: &P, max_r: f32) -> bool {
        if self.radius <= max_r {
            return false;
        }
        let offset = self.cross_section_offset().clamp_length_max(max_r.max(0.0));
        let moved = Self::at(self.id, path, self.path_param, offset);
        self.radius = moved.radius;
        self.position = moved.position;
        true
    }

    /// Spin about the local tumble axis
    pub fn tumble(&mut self, dt: f32) {
        if self.rotation_speed != 0.0 {
            let spin = Quat::from_axis_angle(self.rotation_axis, self.rotation_speed * dt);
            self.orientation = (self.orientation * spin).normalize();
        }
    }
}

/// Spawns obstacles according to [`ObstacleSettings`]
#[derive(Debug, Clone)]
pub struct ObstacleSpawner {
    settings: ObstacleSettings,
}

impl ObstacleSpawner {
    pub fn new(settings: ObstacleSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ObstacleSettings {
        &self.settings
    }

    /// Collision radius of every obstacle
    pub fn obstacle_radius(&self) -> f32 {
        self.settings.sphere_radius()
    }

    /// Furthest an obstacle center may sit from the centerline
    pub fn max_offset(&self, inradius: f32) -> f32 {
        (inradius - self.obstacle_radius() - self.settings.wall_epsilon).max(0.0)
    }

    /// Random path parameter at least `min_path_distance` from `current_progress`.
    ///
    /// Gives up after the retry budget and keeps the last draw; being near the
    /// agent is undesirable, not invalid.
    pub fn sample_path_param<R: Rng + ?Sized>(&self, rng: &mut R, current_progress: f32) -> f32 {
        let mut p: f32 = rng.random();
        for _ in 0..self.settings.spawn_retries {
            if wrapped_distance(p, current_progress) >= self.settings.min_path_distance {
                return p;
            }
            p = rng.random();
        }
        if wrapped_distance(p, current_progress) < self.settings.min_path_distance {
            log::debug!(
                "Spawn retries exhausted near progress {:.3}, keeping p={:.3}",
                current_progress,
                p
            );
        }
        p
    }

    /// Uniform point of the disk of radius `max_r`: sqrt keeps areal density flat
    pub fn sample_disk<R: Rng + ?Sized>(rng: &mut R, max_r: f32) -> (f32, f32) {
        let r = rng.random::<f32>().sqrt() * max_r;
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        (r, theta)
    }

    /// Create one obstacle for a tube of the given inradius
    pub fn spawn<P: Path + ?Sized, R: Rng + ?Sized>(
        &self,
        id: u32,
        path: &P,
        rng: &mut R,
        inradius: f32,
        current_progress: f32,
    ) -> Obstacle {
        let path_param = self.sample_path_param(rng, current_progress);
        let (r, theta) = Self::sample_disk(rng, self.max_offset(inradius));
        let mut obstacle = Obstacle::at(id, path, path_param, polar_to_cartesian(r, theta));

        let magnitude: f32 = rng.random::<f32>() * 0.8 + 0.5;
        let sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
        obstacle.rotation_speed = magnitude * sign;

        // Tumbling around the travel direction would look like no rotation at all
        let tangent = path.tangent_at(path_param);
        let axis = Vec3::new(
            rng.random::<f32>() - 0.5,
            rng.random::<f32>() - 0.5,
            rng.random::<f32>() - 0.5,
        )
        .normalize_or_zero();
        obstacle.rotation_axis = if axis == Vec3::ZERO || axis.dot(tangent).abs() > 0.95 {
            tangent.any_orthonormal_vector()
        } else {
            axis
        };

        obstacle
    }

    /// How many obstacles to add this tick to move from `current` toward `target`
    pub fn batch_size(&self, current: usize, target: usize) -> usize {
        target
            .saturating_sub(current)
            .min(self.settings.spawn_batch as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::path::{CirclePath, ClosedSpline};
    use crate::sim::tube::inradius;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_spawn_avoids_agent() {
        let spline = ClosedSpline::wormhole();
        let spawner = ObstacleSpawner::new(ObstacleSettings::default());
        let mut rng = Pcg32::seed_from_u64(7);
        let too_close = (0..1000)
            .map(|id| spawner.spawn(id, &spline, &mut rng, inradius(16, 0.65), 0.0))
            .filter(|o| wrapped_distance(o.path_param, 0.0) < 0.08)
            .count();
        assert!(too_close <= 2, "{too_close} of 1000 spawned near the agent");
    }

    #[test]
    fn test_spawn_inside_tube() {
        let circle = CirclePath::new(Vec3::ZERO, 8.0);
        let spawner = ObstacleSpawner::new(ObstacleSettings::default());
        let mut rng = Pcg32::seed_from_u64(11);
        let tube_inradius = inradius(5, 0.65);
        for id in 0..500 {
            let obstacle = spawner.spawn(id, &circle, &mut rng, tube_inradius, 0.5);
            let center = circle.point_at(obstacle.path_param);
            let clearance = tube_inradius - obstacle.position.distance(center);
            assert!(clearance >= spawner.obstacle_radius() - 1e-4);
            assert!((0.0..1.0).contains(&obstacle.path_param));
        }
    }

    #[test]
    fn test_disk_sampling_is_uniform_by_area() {
        let mut rng = Pcg32::seed_from_u64(3);
        let samples = 4000;
        let inner = (0..samples)
            .map(|_| ObstacleSpawner::sample_disk(&mut rng, 1.0).0)
            .filter(|&r| r < 0.5)
            .count();
        // Inner half-radius disk holds a quarter of the area
        let fraction = inner as f32 / samples as f32;
        assert!((fraction - 0.25).abs() < 0.05, "fraction {fraction}");
    }

    #[test]
    fn test_exhausted_retries_keep_last_sample() {
        let spawner = ObstacleSpawner::new(ObstacleSettings {
            min_path_distance: 0.5,
            ..Default::default()
        });
        let mut rng = Pcg32::seed_from_u64(5);
        let p = spawner.sample_path_param(&mut rng, 0.0);
        assert!((0.0..1.0).contains(&p));
    }

    #[test]
    fn test_obstacle_faces_tangent_and_tumbles() {
        let circle = CirclePath::new(Vec3::ZERO, 8.0);
        let spawner = ObstacleSpawner::new(ObstacleSettings::default());
        let mut rng = Pcg32::seed_from_u64(21);
        let mut obstacle = spawner.spawn(1, &circle, &mut rng, 0.6, 0.0);
        let tangent = circle.tangent_at(obstacle.path_param);
        assert!((obstacle.orientation * Vec3::Z).dot(tangent) > 0.999);
        assert!(obstacle.rotation_axis.dot(tangent).abs() <= 0.95 + 1e-5);
        assert!((0.5..=1.3).contains(&obstacle.rotation_speed.abs()));

        let before = obstacle.orientation;
        obstacle.tumble(0.1);
        assert!(before.dot(obstacle.orientation).abs() < 1.0);
        assert!((obstacle.orientation.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_tube_spawns_on_centerline() {
        let circle = CirclePath::new(Vec3::ZERO, 8.0);
        let spawner = ObstacleSpawner::new(ObstacleSettings::default());
        let mut rng = Pcg32::seed_from_u64(2);
        let obstacle = spawner.spawn(1, &circle, &mut rng, 0.01, 0.0);
        assert_eq!(obstacle.radius, 0.0);
        assert!(obstacle.position.distance(circle.point_at(obstacle.path_param)) < 1e-5);
    }

    #[test]
    fn test_clamp_radius_after_narrowing() {
        let circle = CirclePath::new(Vec3::ZERO, 8.0);
        let mut obstacle = Obstacle::at(4, &circle, 0.25, Vec2::new(0.3, 0.3));
        let angle = obstacle.angle;
        assert!(!obstacle.clamp_radius(&circle, 1.0));
        assert!(obstacle.clamp_radius(&circle, 0.2));
        assert!((obstacle.radius - 0.2).abs() < 1e-5);
        assert_eq!(obstacle.angle, angle);
        let expected = Vec2::new(0.3, 0.3).normalize() * 0.2;
        assert!(obstacle.cross_section_offset().distance(expected) < 1e-5);
        let center = circle.point_at(0.25);
        assert!((obstacle.position.distance(center) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_batch_size() {
        let spawner = ObstacleSpawner::new(ObstacleSettings::default());
        assert_eq!(spawner.batch_size(40, 40), 0);
        assert_eq!(spawner.batch_size(40, 52), 12);
        assert_eq!(spawner.batch_size(0, 400), 24);
        assert_eq!(spawner.batch_size(500, 400), 0);
    }
}
