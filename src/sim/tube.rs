//! Swept polygon tube around a closed path
//!
//! A ring of `sides` vertices is placed around every path sample and adjacent
//! rings are stitched into triangles. Frames are parallel-transported along the
//! path and the accumulated twist is spread over the loop so the last ring
//! lines up with the first.
//!
//! Building is pure. A side-count change builds a whole new [`TubeGeometry`]
//! (mesh, edge overlay and markers together), which the engine swaps in.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::path::{CrossSectionFrame, Path};
use crate::consts::GEOM_EPSILON;
use crate::error::{GeometryFault, Result};

/// Polygonal cross-section of the tube
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TubeCrossSection {
    pub sides: u32,
    /// Circumradius (center to polygon corner)
    pub outer_radius: f32,
    /// Apothem (center to edge midpoint), the true inner wall
    pub inradius: f32,
}

impl TubeCrossSection {
    pub fn new(sides: u32, outer_radius: f32) -> Result<Self> {
        if sides < 3 {
            return Err(GeometryFault::TooFewSides(sides).into());
        }
        if !(outer_radius > 0.0 && outer_radius.is_finite()) {
            return Err(GeometryFault::NonPositiveRadius(outer_radius).into());
        }
        Ok(Self {
            sides,
            outer_radius,
            inradius: inradius(sides, outer_radius),
        })
    }
}

/// Apothem of a regular polygon with the given side count and circumradius
#[inline]
pub fn inradius(sides: u32, outer_radius: f32) -> f32 {
    outer_radius * (std::f32::consts::PI / sides as f32).cos()
}

/// Tube vertex as uploaded to the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TubeVertex {
    pub position: [f32; 3],
    /// Outward radial direction
    pub normal: [f32; 3],
}

impl TubeVertex {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Indexed triangle mesh of the tube wall
#[derive(Debug, Clone)]
pub struct TubeMesh {
    pub vertices: Vec<TubeVertex>,
    pub indices: Vec<u32>,
    /// Ring count along the path
    pub rings: u32,
    /// Vertices per ring
    pub sides: u32,
}

impl TubeMesh {
    /// Index of the vertex at (`ring`, `side`); both wrap
    #[inline]
    pub fn vertex_index(&self, ring: u32, side: u32) -> u32 {
        (ring % self.rings) * self.sides + side % self.sides
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Everything derived from one tube build
#[derive(Debug, Clone)]
pub struct TubeGeometry {
    pub cross_section: TubeCrossSection,
    pub mesh: TubeMesh,
    /// Wireframe line segments, inset from the wall
    pub edges: Vec<[Vec3; 2]>,
    /// One marker per distinct (inset) mesh vertex
    pub markers: Vec<Vec3>,
}

impl TubeGeometry {
    pub fn sides(&self) -> u32 {
        self.cross_section.sides
    }

    pub fn inradius(&self) -> f32 {
        self.cross_section.inradius
    }
}

/// Build a closed tube of `sides`-gon cross-section around `path`
pub fn build<P: Path + ?Sized>(
    path: &P,
    sides: u32,
    tubular_segments: u32,
    outer_radius: f32,
    edge_inset: f32,
) -> Result<TubeGeometry> {
    let cross_section = TubeCrossSection::new(sides, outer_radius)?;
    if tubular_segments < 3 {
        return Err(GeometryFault::TooFewSegments(tubular_segments).into());
    }

    let frames = compute_frames(path, tubular_segments);
    let mut vertices = Vec::with_capacity((tubular_segments * sides) as usize);
    for (ring, frame) in frames.iter().enumerate() {
        let center = path.point_at(ring as f32 / tubular_segments as f32);
        for side in 0..sides {
            let v = side as f32 / sides as f32 * std::f32::consts::TAU;
            let normal = (frame.normal * -v.cos() + frame.binormal * v.sin()).normalize();
            let position = center + normal * outer_radius;
            vertices.push(TubeVertex {
                position: position.to_array(),
                normal: normal.to_array(),
            });
        }
    }

    let mut mesh = TubeMesh {
        vertices,
        indices: Vec::with_capacity((tubular_segments * sides * 6) as usize),
        rings: tubular_segments,
        sides,
    };
    for ring in 0..tubular_segments {
        for side in 0..sides {
            let a = mesh.vertex_index(ring, side);
            let b = mesh.vertex_index(ring + 1, side);
            let c = mesh.vertex_index(ring + 1, side + 1);
            let d = mesh.vertex_index(ring, side + 1);
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    let inset = |index: u32| {
        let vertex = &mesh.vertices[index as usize];
        vertex.position() - vertex.normal() * edge_inset
    };
    let mut edges = Vec::with_capacity((tubular_segments * sides * 2) as usize);
    for ring in 0..tubular_segments {
        for side in 0..sides {
            let here = mesh.vertex_index(ring, side);
            // Around the ring, then along the path
            edges.push([inset(here), inset(mesh.vertex_index(ring, side + 1))]);
            edges.push([inset(here), inset(mesh.vertex_index(ring + 1, side))]);
        }
    }
    let markers = (0..mesh.vertices.len() as u32).map(inset).collect();

    log::debug!(
        "Built tube: sides={}, rings={}, inradius={:.4}, triangles={}",
        sides,
        tubular_segments,
        cross_section.inradius,
        mesh.triangle_count()
    );

    Ok(TubeGeometry {
        cross_section,
        mesh,
        edges,
        markers,
    })
}

/// Parallel-transport frames at `segments` evenly spaced path parameters.
///
/// The first normal starts perpendicular to the tangent's smallest axis. After
/// one lap the transported normal generally disagrees with the first one; that
/// angle is distributed evenly over all frames.
pub fn compute_frames<P: Path + ?Sized>(path: &P, segments: u32) -> Vec<CrossSectionFrame> {
    let count = segments as usize;
    let tangents: Vec<Vec3> = (0..=count)
        .map(|i| path.tangent_at(i as f32 / segments as f32))
        .collect();

    let t0 = tangents[0];
    let abs = t0.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let side = t0.cross(axis).normalize();
    let mut normals = Vec::with_capacity(count + 1);
    normals.push(t0.cross(side));

    for i in 1..=count {
        let previous = normals[i - 1];
        let turn = tangents[i - 1].cross(tangents[i]);
        let normal = if turn.length() > GEOM_EPSILON {
            let angle = tangents[i - 1].dot(tangents[i]).clamp(-1.0, 1.0).acos();
            Quat::from_axis_angle(turn.normalize(), angle) * previous
        } else {
            previous
        };
        normals.push(normal);
    }

    let mut twist = normals[0].dot(normals[count]).clamp(-1.0, 1.0).acos() / segments as f32;
    if t0.dot(normals[0].cross(normals[count])) > 0.0 {
        twist = -twist;
    }

    (0..count)
        .map(|i| {
            let tangent = tangents[i];
            let normal = (Quat::from_axis_angle(tangent, twist * i as f32) * normals[i]).normalize();
            CrossSectionFrame {
                tangent,
                normal,
                binormal: tangent.cross(normal).normalize(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use crate::sim::path::{CirclePath, ClosedSpline};
    use proptest::prelude::*;

    #[test]
    fn test_rejects_invalid_geometry() {
        let circle = CirclePath::new(Vec3::ZERO, 5.0);
        let err = build(&circle, 2, 32, 0.65, 0.0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidGeometry(GeometryFault::TooFewSides(2))
        ));
        let err = build(&circle, 8, 32, 0.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidGeometry(GeometryFault::NonPositiveRadius(_))
        ));
        let err = build(&circle, 8, 2, 0.65, 0.0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidGeometry(GeometryFault::TooFewSegments(2))
        ));
    }

    #[test]
    fn test_mesh_topology() {
        let circle = CirclePath::new(Vec3::ZERO, 5.0);
        let tube = build(&circle, 5, 40, 0.65, 0.01).unwrap();
        assert_eq!(tube.mesh.vertices.len(), 40 * 5);
        assert_eq!(tube.mesh.triangle_count(), 40 * 5 * 2);
        assert_eq!(tube.edges.len(), 40 * 5 * 2);
        assert_eq!(tube.markers.len(), 40 * 5);
        assert!(tube.mesh.indices.iter().all(|&i| (i as usize) < tube.mesh.vertices.len()));
        assert_eq!(
            tube.mesh.vertex_bytes().len(),
            tube.mesh.vertices.len() * std::mem::size_of::<TubeVertex>()
        );
        assert_eq!(tube.mesh.index_bytes().len(), tube.mesh.indices.len() * 4);
    }

    #[test]
    fn test_rings_sit_on_outer_radius() {
        let circle = CirclePath::new(Vec3::ZERO, 5.0);
        let tube = build(&circle, 7, 32, 0.65, 0.0).unwrap();
        for ring in 0..32 {
            let center = circle.point_at(ring as f32 / 32.0);
            for side in 0..7 {
                let v = tube.mesh.vertices[tube.mesh.vertex_index(ring, side) as usize];
                assert!((v.position().distance(center) - 0.65).abs() < 1e-4);
            }
            // Edge midpoints are the closest wall points: exactly the inradius away
            let a = tube.mesh.vertices[tube.mesh.vertex_index(ring, 0) as usize].position();
            let b = tube.mesh.vertices[tube.mesh.vertex_index(ring, 1) as usize].position();
            let midpoint = (a + b) * 0.5;
            assert!((midpoint.distance(center) - tube.inradius()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_markers_are_inset() {
        let circle = CirclePath::new(Vec3::ZERO, 5.0);
        let tube = build(&circle, 4, 16, 0.65, 0.05).unwrap();
        let center = circle.point_at(0.0);
        assert!((tube.markers[0].distance(center) - 0.60).abs() < 1e-4);
    }

    #[test]
    fn test_frames_close_the_loop() {
        let spline = ClosedSpline::wormhole();
        let frames = compute_frames(&spline, 256);
        assert_eq!(frames.len(), 256);
        for frame in &frames {
            assert!(frame.normal.dot(frame.tangent).abs() < 1e-3);
            assert!((frame.normal.length() - 1.0).abs() < 1e-4);
        }
        // No visible twist across the seam
        let first = frames[0];
        let last = frames[255];
        assert!(first.normal.dot(last.normal) > 0.95);
    }

    #[test]
    fn test_rebuild_produces_new_derived_buffers() {
        let spline = ClosedSpline::wormhole();
        let sixteen = build(&spline, 16, 64, 0.65, 0.012).unwrap();
        let three = build(&spline, 3, 64, 0.65, 0.012).unwrap();
        assert_eq!(three.sides(), 3);
        assert_eq!(three.markers.len(), 64 * 3);
        assert_eq!(sixteen.markers.len(), 64 * 16);
        assert!(three.inradius() < sixteen.inradius());
    }

    proptest! {
        #[test]
        fn prop_inradius_matches_apothem(sides in 3u32..256, radius in 0.01f32..100.0) {
            let section = TubeCrossSection::new(sides, radius).unwrap();
            let expected = radius * (std::f32::consts::PI / sides as f32).cos();
            prop_assert!((section.inradius - expected).abs() <= 1e-5 * radius);
        }

        #[test]
        fn prop_inradius_grows_toward_outer_radius(sides in 3u32..200, radius in 0.1f32..10.0) {
            let fewer = inradius(sides, radius);
            let more = inradius(sides + 1, radius);
            prop_assert!(more > fewer);
            prop_assert!(more < radius);
        }
    }
}
