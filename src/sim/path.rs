//! Closed 3D paths the agent travels along
//!
//! The engine only reads a path through the [`Path`] trait. `t` is a normalized,
//! periodic parameter: `t` and `t + 1` name the same point.

use glam::{Vec2, Vec3};

use crate::consts::GEOM_EPSILON;
use crate::error::{EngineError, Result};
use crate::wrap_unit;

/// A closed, parametrized curve
pub trait Path {
    /// Position at normalized parameter `t` (wraps)
    fn point_at(&self, t: f32) -> Vec3;
    /// Unit tangent at normalized parameter `t` (wraps)
    fn tangent_at(&self, t: f32) -> Vec3;
}

/// Orthonormal frame across the path at one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSectionFrame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl CrossSectionFrame {
    /// Build a frame around `tangent` using world up as a hint.
    ///
    /// When the tangent is close to vertical the hint switches to +X, so the
    /// cross products never collapse.
    pub fn from_tangent(tangent: Vec3) -> Self {
        let tangent = tangent.normalize_or_zero();
        let tangent = if tangent == Vec3::ZERO { Vec3::Z } else { tangent };
        let hint = if tangent.dot(Vec3::Y).abs() > 0.9 {
            log::debug!("Degenerate cross-section frame, using +X as up hint");
            Vec3::X
        } else {
            Vec3::Y
        };
        let binormal = tangent.cross(hint).normalize();
        let normal = binormal.cross(tangent).normalize();
        Self {
            tangent,
            normal,
            binormal,
        }
    }

    /// Map a 2D cross-section offset (x along normal, y along binormal) to world space
    #[inline]
    pub fn offset(&self, local: Vec2) -> Vec3 {
        self.normal * local.x + self.binormal * local.y
    }
}

/// Number of chord samples in the arc-length lookup table
const ARC_LENGTH_DIVISIONS: usize = 200;
/// Parameter step used for finite-difference tangents
const TANGENT_DELTA: f32 = 1e-4;

/// Closed centripetal Catmull-Rom spline, parametrized by arc length
#[derive(Debug, Clone)]
pub struct ClosedSpline {
    points: Vec<Vec3>,
    /// Cumulative chord length at each of `ARC_LENGTH_DIVISIONS + 1` samples
    arc_lengths: Vec<f32>,
}

impl ClosedSpline {
    /// Build a closed spline through `points` (the last point connects back to the first)
    pub fn new(points: Vec<Vec3>) -> Result<Self> {
        if points.len() < 4 {
            return Err(EngineError::InvalidConfig(
                "closed spline needs at least 4 control points",
            ));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(EngineError::InvalidConfig("spline control points must be finite"));
        }

        let spline = Self::with_points(points);
        if spline.length() <= GEOM_EPSILON {
            return Err(EngineError::InvalidConfig("spline has zero length"));
        }
        Ok(spline)
    }

    fn with_points(points: Vec<Vec3>) -> Self {
        let mut spline = Self {
            points,
            arc_lengths: Vec::new(),
        };
        spline.arc_lengths = spline.compute_arc_lengths();
        spline
    }

    /// The default tunnel: a trefoil knot, so the loop crosses over itself
    /// without ever intersecting.
    pub fn wormhole() -> Self {
        let count = 24;
        let scale = 4.0;
        let points = (0..count)
            .map(|i| {
                let t = i as f32 / count as f32 * std::f32::consts::TAU;
                Vec3::new(
                    t.sin() + 2.0 * (2.0 * t).sin(),
                    -(3.0 * t).sin(),
                    t.cos() - 2.0 * (2.0 * t).cos(),
                ) * scale
            })
            .collect();
        Self::with_points(points)
    }

    /// Control points
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Total length of the loop
    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at raw spline parameter `s` (uniform in control-point index, not distance)
    fn point_at_raw(&self, s: f32) -> Vec3 {
        let count = self.points.len();
        let p = count as f32 * wrap_unit(s);
        let index = (p.floor() as usize).min(count - 1);
        let weight = p - index as f32;

        let p0 = self.points[(index + count - 1) % count];
        let p1 = self.points[index];
        let p2 = self.points[(index + 1) % count];
        let p3 = self.points[(index + 2) % count];

        // Centripetal parametrization: knot spacing is sqrt of chord length
        let mut dt1 = p1.distance_squared(p2).powf(0.25);
        let mut dt0 = p0.distance_squared(p1).powf(0.25);
        let mut dt2 = p2.distance_squared(p3).powf(0.25);
        if dt1 < 1e-4 {
            dt1 = 1.0;
        }
        if dt0 < 1e-4 {
            dt0 = dt1;
        }
        if dt2 < 1e-4 {
            dt2 = dt1;
        }

        let t1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
        let t2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

        // Cubic Hermite between p1 and p2
        let c0 = p1;
        let c1 = t1;
        let c2 = -3.0 * p1 + 3.0 * p2 - 2.0 * t1 - t2;
        let c3 = 2.0 * p1 - 2.0 * p2 + t1 + t2;
        let w = weight;
        c0 + c1 * w + c2 * (w * w) + c3 * (w * w * w)
    }

    fn compute_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut total = 0.0;
        let mut last = self.point_at_raw(0.0);
        lengths.push(0.0);
        for i in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point_at_raw(i as f32 / ARC_LENGTH_DIVISIONS as f32);
            total += current.distance(last);
            lengths.push(total);
            last = current;
        }
        lengths
    }

    /// Map a distance fraction `u` to the raw spline parameter
    fn raw_param_for(&self, u: f32) -> f32 {
        let u = wrap_unit(u);
        let target = u * self.length();
        let last = self.arc_lengths.len() - 1;

        let index = self
            .arc_lengths
            .partition_point(|&len| len < target)
            .saturating_sub(1)
            .min(last - 1);
        let before = self.arc_lengths[index];
        let after = self.arc_lengths[index + 1];
        let segment = after - before;
        let fraction = if segment > GEOM_EPSILON {
            ((target - before) / segment).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (index as f32 + fraction) / last as f32
    }
}

impl Path for ClosedSpline {
    fn point_at(&self, t: f32) -> Vec3 {
        self.point_at_raw(self.raw_param_for(t))
    }

    fn tangent_at(&self, t: f32) -> Vec3 {
        let s = self.raw_param_for(t);
        let ahead = self.point_at_raw(s + TANGENT_DELTA);
        let behind = self.point_at_raw(s - TANGENT_DELTA);
        let tangent = (ahead - behind).normalize_or_zero();
        if tangent == Vec3::ZERO { Vec3::Z } else { tangent }
    }
}

/// A circle in the XZ plane
#[derive(Debug, Clone, Copy)]
pub struct CirclePath {
    pub center: Vec3,
    pub radius: f32,
}

impl CirclePath {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl Path for CirclePath {
    fn point_at(&self, t: f32) -> Vec3 {
        let angle = wrap_unit(t) * std::f32::consts::TAU;
        self.center + Vec3::new(angle.cos(), 0.0, angle.sin()) * self.radius
    }

    fn tangent_at(&self, t: f32) -> Vec3 {
        let angle = wrap_unit(t) * std::f32::consts::TAU;
        Vec3::new(-angle.sin(), 0.0, angle.cos())
    }
}
