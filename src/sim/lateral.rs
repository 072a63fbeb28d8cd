//! Lateral steering inside the tube
//!
//! Input is a 2D intent in screen space (x = right, y = up). The screen basis is
//! rebuilt every tick from the direction toward a point slightly ahead on the
//! path, so "right" always means right as seen looking down the tunnel.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::path::Path;
use crate::consts::GEOM_EPSILON;
use crate::settings::LateralSettings;
use crate::wrap_unit;

/// Screen-relative axes at the agent's position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl ScreenBasis {
    /// Basis looking along `forward`, with world +Y as up (or +X when looking
    /// nearly straight up or down)
    pub fn from_forward(forward: Vec3) -> Self {
        let forward = forward.normalize_or_zero();
        let forward = if forward == Vec3::ZERO { Vec3::NEG_Z } else { forward };
        let hint = if forward.dot(Vec3::Y).abs() > 0.999 {
            log::debug!("Degenerate screen basis, using +X as up hint");
            Vec3::X
        } else {
            Vec3::Y
        };
        let right = forward.cross(hint).normalize();
        let up = right.cross(forward).normalize();
        Self { forward, right, up }
    }

    /// Basis at `t`, looking toward `t + lookahead`
    pub fn at<P: Path + ?Sized>(path: &P, t: f32, lookahead: f32) -> Self {
        let here = path.point_at(t);
        let ahead = path.point_at(wrap_unit(t + lookahead));
        let direction = ahead - here;
        if direction.length() > GEOM_EPSILON {
            Self::from_forward(direction)
        } else {
            Self::from_forward(path.tangent_at(t))
        }
    }

    /// Screen offset to world space
    #[inline]
    pub fn to_world(&self, offset: Vec2) -> Vec3 {
        self.right * offset.x + self.up * offset.y
    }

    /// World offset projected back onto the screen axes
    #[inline]
    pub fn to_screen(&self, world: Vec3) -> Vec2 {
        Vec2::new(world.dot(self.right), world.dot(self.up))
    }
}

/// Largest offset that keeps an agent sphere inside the tube wall, never negative
#[inline]
pub fn containment_radius(inradius: f32, agent_radius: f32, epsilon: f32) -> f32 {
    (inradius - agent_radius - epsilon).max(0.0)
}

/// Velocity-integrated lateral offset with hard containment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateralController {
    settings: LateralSettings,
    pub offset: Vec2,
    pub velocity: Vec2,
}

impl LateralController {
    pub fn new(settings: LateralSettings) -> Self {
        Self {
            settings,
            offset: Vec2::ZERO,
            velocity: Vec2::ZERO,
        }
    }

    pub fn settings(&self) -> &LateralSettings {
        &self.settings
    }

    /// Current containment limit for a tube of the given inradius
    pub fn limit(&self, inradius: f32) -> f32 {
        containment_radius(
            inradius,
            self.settings.agent_radius,
            self.settings.containment_epsilon,
        )
        .min(self.settings.max_lateral)
    }

    /// Steer by `intent` for `dt` seconds and return the contained offset
    pub fn tick(&mut self, dt: f32, intent: Vec2, basis: &ScreenBasis, inradius: f32) -> Vec2 {
        let intent = if intent.is_finite() {
            intent.clamp(Vec2::NEG_ONE, Vec2::ONE)
        } else {
            Vec2::ZERO
        };

        let blend = (self.settings.lateral_accel * dt).min(1.0);
        let wanted = intent * self.settings.max_lateral_speed;
        self.velocity = self.velocity.lerp(wanted, blend);

        let offset = (self.offset + self.velocity * dt).clamp_length_max(self.settings.max_lateral);

        let wall = containment_radius(
            inradius,
            self.settings.agent_radius,
            self.settings.containment_epsilon,
        );
        self.offset = if wall <= 0.0 {
            Vec2::ZERO
        } else {
            let world = basis.to_world(offset);
            if world.length() > wall {
                // Store what was actually applied so next tick starts at the wall
                basis.to_screen(world.clamp_length_max(wall))
            } else {
                offset
            }
        };
        self.offset
    }

    /// Pull the offset back inside a tube of the given inradius
    pub fn contain(&mut self, inradius: f32) {
        self.offset = self.offset.clamp_length_max(self.limit(inradius).max(0.0));
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.velocity = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::path::ClosedSpline;
    use crate::sim::tube::inradius;
    use proptest::prelude::*;

    fn basis() -> ScreenBasis {
        ScreenBasis::from_forward(Vec3::NEG_Z)
    }

    #[test]
    fn test_basis_orientation() {
        let b = basis();
        assert!(b.right.distance(Vec3::X) < 1e-6);
        assert!(b.up.distance(Vec3::Y) < 1e-6);
    }

    #[test]
    fn test_degenerate_forward_falls_back() {
        let b = ScreenBasis::from_forward(Vec3::Y);
        assert!(b.right.is_finite() && b.up.is_finite());
        assert!((b.right.length() - 1.0).abs() < 1e-5);
        assert!(b.right.dot(b.forward).abs() < 1e-5);

        let b = ScreenBasis::from_forward(Vec3::ZERO);
        assert!(b.right.is_finite());
    }

    #[test]
    fn test_basis_follows_path() {
        let spline = ClosedSpline::wormhole();
        let b = ScreenBasis::at(&spline, 0.2, 0.002);
        assert!(b.forward.dot(spline.tangent_at(0.2)) > 0.99);
    }

    #[test]
    fn test_accelerates_toward_intent() {
        let mut lateral = LateralController::new(LateralSettings::default());
        lateral.tick(0.016, Vec2::X, &basis(), 0.6);
        assert!(lateral.velocity.x > 0.0);
        assert!(lateral.velocity.x < 0.5);
        for _ in 0..20 {
            lateral.tick(0.016, Vec2::X, &basis(), 0.6);
        }
        assert!(lateral.offset.x > 0.0);
        assert!(lateral.offset.y.abs() < 1e-6);
    }

    #[test]
    fn test_clamps_to_wall_and_stores_clamped_offset() {
        let mut lateral = LateralController::new(LateralSettings::default());
        // Triangle: inradius ~0.325, wall at 0.325 - 0.06 - 0.005
        let tube_inradius = inradius(3, 0.65);
        for _ in 0..500 {
            lateral.tick(0.05, Vec2::new(1.0, 1.0), &basis(), tube_inradius);
        }
        let wall = tube_inradius - 0.065;
        assert!((lateral.offset.length() - wall).abs() < 1e-4);
        // Releasing input moves back inward immediately instead of fighting a stale offset
        let before = lateral.offset.length();
        for _ in 0..10 {
            lateral.tick(0.05, Vec2::new(-1.0, -1.0), &basis(), tube_inradius);
        }
        assert!(lateral.offset.length() < before);
    }

    #[test]
    fn test_contain_after_narrowing() {
        let mut lateral = LateralController::new(LateralSettings::default());
        for _ in 0..200 {
            lateral.tick(0.05, Vec2::new(0.0, 1.0), &basis(), inradius(16, 0.65));
        }
        assert!((lateral.offset.length() - 0.45).abs() < 1e-4);

        let narrow = inradius(3, 0.65);
        lateral.contain(narrow);
        assert!(lateral.offset.length() <= lateral.limit(narrow) + 1e-6);
        // Direction is kept
        assert!(lateral.offset.x.abs() < 1e-6 && lateral.offset.y > 0.0);

        lateral.contain(0.01);
        assert_eq!(lateral.offset, Vec2::ZERO);
    }

    #[test]
    fn test_degenerate_tube_pins_to_center() {
        let mut lateral = LateralController::new(LateralSettings::default());
        let offset = lateral.tick(0.05, Vec2::ONE, &basis(), 0.01);
        assert_eq!(offset, Vec2::ZERO);
        assert_eq!(lateral.limit(0.01), 0.0);
    }

    #[test]
    fn test_non_finite_intent_ignored() {
        let mut lateral = LateralController::new(LateralSettings::default());
        let offset = lateral.tick(0.05, Vec2::new(f32::NAN, 1.0), &basis(), 0.6);
        assert!(offset.is_finite());
        assert_eq!(offset, Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_offset_always_contained(
            inputs in prop::collection::vec((-1.0f32..=1.0, -1.0f32..=1.0, 0.0001f32..0.05), 1..300),
            sides in 3u32..32,
        ) {
            let mut lateral = LateralController::new(LateralSettings::default());
            let tube_inradius = inradius(sides, 0.65);
            let limit = lateral.limit(tube_inradius);
            for (x, y, dt) in inputs {
                let offset = lateral.tick(dt, Vec2::new(x, y), &basis(), tube_inradius);
                prop_assert!(offset.length() <= limit + 1e-5);
            }
        }

        #[test]
        fn prop_sustained_max_input_contained(ticks in 1usize..2000, sides in 3u32..32) {
            let mut lateral = LateralController::new(LateralSettings::default());
            let tube_inradius = inradius(sides, 0.65);
            let limit = lateral.limit(tube_inradius);
            for _ in 0..ticks {
                let offset = lateral.tick(0.05, Vec2::new(1.0, -1.0), &basis(), tube_inradius);
                prop_assert!(offset.length() <= limit + 1e-5);
            }
        }
    }
}
