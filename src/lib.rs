//! Wormhole - a tunnel runner core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (path, tube geometry, motion, obstacles, scoring)
//! - `style`: Per-bucket visual style table and cross-section side selection
//! - `highscores`: High score persistence collaborators
//! - `settings`: Data-driven tuning with difficulty presets
//! - `error`: Error taxonomy

pub mod error;
pub mod highscores;
pub mod settings;
pub mod sim;
pub mod style;

pub use error::{EngineError, GeometryFault, Result};
pub use highscores::{HighScoreStore, JsonFileStore, MemoryStore};
pub use settings::{Difficulty, Settings};
pub use style::{StyleSelector, StyleTable, TubeStyle};

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep used by the headless driver (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Score points per style/density bucket
    pub const POINTS_PER_BUCKET: u64 = 10;

    /// Below this length a vector is treated as zero
    pub const GEOM_EPSILON: f32 = 1e-6;
    /// Extra distance added to a collision push-out so contacts fully separate
    pub const PUSH_SLOP: f32 = 1e-4;
}

/// Wrap a path parameter into [0, 1)
#[inline]
pub fn wrap_unit(t: f32) -> f32 {
    let wrapped = t.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Circular distance between two path parameters, in [0, 0.5]
#[inline]
pub fn wrapped_distance(a: f32, b: f32) -> f32 {
    let d = wrap_unit(a - b);
    d.min(1.0 - d)
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Score bucket (floor(score / 10)) used for density and style steps
#[inline]
pub fn score_bucket(score: u64) -> u64 {
    score / consts::POINTS_PER_BUCKET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(0.25), 0.25);
        assert!((wrap_unit(1.25) - 0.25).abs() < 1e-6);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-6);
        assert!(wrap_unit(-1e-12) < 1.0);
    }

    #[test]
    fn test_wrapped_distance() {
        assert!((wrapped_distance(0.95, 0.05) - 0.1).abs() < 1e-6);
        assert!((wrapped_distance(0.05, 0.95) - 0.1).abs() < 1e-6);
        assert!((wrapped_distance(0.5, 0.0) - 0.5).abs() < 1e-6);
        assert_eq!(wrapped_distance(0.3, 0.3), 0.0);
    }

    #[test]
    fn test_score_bucket() {
        assert_eq!(score_bucket(0), 0);
        assert_eq!(score_bucket(9), 0);
        assert_eq!(score_bucket(10), 1);
        assert_eq!(score_bucket(57), 5);
    }
}
