//! CAD Kernel trait definitions
//!
//! These traits define the interface that all CAD kernels must implement.

use glam::{DAffine3, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::sketch::SketchPlane;

/// Error type for CAD kernel operations
#[derive(Debug, Clone, Error)]
pub enum CadError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Tessellation failed: {0}")]
    TessellationFailed(String),

    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for CAD operations
pub type CadResult<T> = Result<T, CadError>;

/// Edge groups that fillet and chamfer operations act on.
///
/// Prismatic and lofted solids have a sketch normal; edges are classified
/// relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeSelector {
    /// Edges running along the sketch normal (the side corners)
    Lateral,
    /// Edges bounding the end face furthest along the normal
    Top,
    /// Edges bounding the end face at the start of the normal
    Bottom,
}

/// A tessellated mesh output from the CAD kernel
#[derive(Debug, Clone, Default)]
pub struct TessellatedMesh {
    /// Vertex positions (3 floats per vertex)
    pub vertices: Vec<[f32; 3]>,
    /// Vertex normals (3 floats per vertex)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (3 indices per triangle)
    pub indices: Vec<u32>,
}

impl TessellatedMesh {
    /// Create an empty tessellated mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Uniformly scale vertex positions about the origin
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v[0] *= factor;
            v[1] *= factor;
            v[2] *= factor;
        }
    }

    /// Append another mesh, re-indexing its triangles
    pub fn merge(&mut self, other: &TessellatedMesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Iterate triangles as vertex triples
    pub fn triangles(&self) -> impl Iterator<Item = [[f32; 3]; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }
}

/// A 2D wire (ordered loop of points) for extrusion and revolve profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire2D {
    /// Points defining the wire (in order)
    pub points: Vec<DVec2>,
    /// Whether the wire is closed
    pub closed: bool,
}

impl Wire2D {
    /// Create a new wire from points
    pub fn new(points: Vec<DVec2>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// Create a rectangle wire
    pub fn rectangle(center: DVec2, width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(
            vec![
                center + DVec2::new(-hw, -hh),
                center + DVec2::new(hw, -hh),
                center + DVec2::new(hw, hh),
                center + DVec2::new(-hw, hh),
            ],
            true,
        )
    }

    /// Create a circle wire (approximated with segments)
    pub fn circle(center: DVec2, radius: f64, segments: u32) -> Self {
        let points = (0..segments)
            .map(|i| {
                let angle = (i as f64 / segments as f64) * std::f64::consts::TAU;
                center + DVec2::new(angle.cos() * radius, angle.sin() * radius)
            })
            .collect();
        Self::new(points, true)
    }

    /// Rectangle centered at the origin with 45° corner cuts.
    ///
    /// The lower-left corner is cut by `cv1`, the other three by `cv`. The
    /// outline has 9 points with the first one repeated at the end. Chamfers
    /// must stay below half of the corresponding side; this is not checked.
    pub fn chamfered_rect(width: f64, height: f64, cv1: f64, cv: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let first = DVec2::new(-hw, -hh + cv1);
        Self::new(
            vec![
                first,
                DVec2::new(-hw, hh - cv),
                DVec2::new(-hw + cv, hh),
                DVec2::new(hw - cv, hh),
                DVec2::new(hw, hh - cv),
                DVec2::new(hw, -hh + cv),
                DVec2::new(hw - cv, -hh),
                DVec2::new(-hw + cv1, -hh),
                first,
            ],
            true,
        )
    }

    /// Copy of this wire moved by `offset`
    pub fn translated(&self, offset: DVec2) -> Self {
        Self::new(
            self.points.iter().map(|p| *p + offset).collect(),
            self.closed,
        )
    }

    /// Copy of this wire mirrored across the local Y axis
    pub fn mirrored_x(&self) -> Self {
        Self::new(
            self.points.iter().map(|p| DVec2::new(-p.x, p.y)).collect(),
            self.closed,
        )
    }

    /// Points of a closed loop without a repeated closing point
    pub fn loop_points(&self) -> &[DVec2] {
        match self.points.as_slice() {
            [first, rest @ .., last] if self.closed && !rest.is_empty() => {
                if first.distance_squared(*last) < 1e-18 {
                    &self.points[..self.points.len() - 1]
                } else {
                    &self.points
                }
            }
            _ => &self.points,
        }
    }

    /// Signed area of the closed loop (positive when counter-clockwise)
    pub fn signed_area(&self) -> f64 {
        let pts = self.loop_points();
        let n = pts.len();
        (0..n)
            .map(|i| pts[i].perp_dot(pts[(i + 1) % n]))
            .sum::<f64>()
            / 2.0
    }
}

/// A 3D solid body
///
/// The handle is cheap to copy; geometry lives inside the kernel that
/// created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Solid {
    /// Unique identifier
    pub id: Uuid,
}

impl Solid {
    /// Create a new solid with the given ID
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

/// Axis definition for revolve and rotate operations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis3D {
    /// Origin point of the axis
    pub origin: DVec3,
    /// Direction of the axis (normalized)
    pub direction: DVec3,
}

impl Axis3D {
    /// Create an axis from origin and direction
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// X axis at origin
    pub fn x() -> Self {
        Self::new(DVec3::ZERO, DVec3::X)
    }

    /// Y axis at origin
    pub fn y() -> Self {
        Self::new(DVec3::ZERO, DVec3::Y)
    }

    /// Z axis at origin
    pub fn z() -> Self {
        Self::new(DVec3::ZERO, DVec3::Z)
    }

    /// Rigid transform rotating by `angle` radians around this axis
    pub fn rotation(&self, angle: f64) -> DAffine3 {
        DAffine3::from_translation(self.origin)
            * DAffine3::from_axis_angle(self.direction, angle)
            * DAffine3::from_translation(-self.origin)
    }
}

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanType {
    /// Union (add)
    Union,
    /// Subtraction (cut)
    Subtract,
    /// Intersection (common)
    Intersect,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |bb, p| {
            Self::new(bb.min.min(p), bb.max.max(p))
        }))
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Overlapping region, `None` when the boxes are disjoint
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min.cmple(max).all()).then(|| Self::new(min, max))
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Euclidean distance from `point` to the box (zero inside)
    pub fn distance(&self, point: DVec3) -> f64 {
        let d = (self.min - point).max(point - self.max).max(DVec3::ZERO);
        d.length()
    }

    pub fn expanded(&self, margin: f64) -> BoundingBox {
        Self::new(self.min - DVec3::splat(margin), self.max + DVec3::splat(margin))
    }

    /// Bounds of this box after a rigid transform
    pub fn transformed(&self, transform: &DAffine3) -> BoundingBox {
        let corners = (0..8).map(|i| {
            let p = DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            transform.transform_point3(p)
        });
        // eight corners are always present
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// The main CAD kernel trait
///
/// Implementations of this trait provide the actual geometry operations.
/// Solids returned by one kernel are only meaningful to that kernel.
pub trait CadKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if the kernel is available
    fn is_available(&self) -> bool;

    /// Extrude a closed 2D profile along the plane normal
    ///
    /// # Arguments
    /// * `profile` - The closed 2D wire to extrude
    /// * `plane` - Placement of the profile
    /// * `distance` - Extrusion distance; negative extrudes against the normal
    fn extrude(&self, profile: &Wire2D, plane: &SketchPlane, distance: f64) -> CadResult<Solid>;

    /// Revolve a closed 2D profile around an axis lying in the sketch plane
    ///
    /// # Arguments
    /// * `profile` - The 2D wire profile, entirely on one side of the axis
    /// * `plane` - Placement of the profile
    /// * `axis` - The rotation axis (world coordinates)
    /// * `angle` - The rotation angle in radians, `(0, 2π]`
    fn revolve(
        &self,
        profile: &Wire2D,
        plane: &SketchPlane,
        axis: &Axis3D,
        angle: f64,
    ) -> CadResult<Solid>;

    /// Loft through parallel sections ordered along their common normal
    ///
    /// # Arguments
    /// * `sections` - Profiles with their planes; all must share a vertex count
    /// * `ruled` - Whether to use ruled surfaces between sections
    fn loft(&self, sections: &[(Wire2D, SketchPlane)], ruled: bool) -> CadResult<Solid>;

    /// Perform a boolean operation on two solids
    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid>;

    /// Union a list of solids into one
    fn union_all(&self, solids: &[Solid]) -> CadResult<Solid> {
        let (first, rest) = solids
            .split_first()
            .ok_or_else(|| CadError::OperationFailed("Union of zero solids".into()))?;
        rest.iter()
            .try_fold(*first, |acc, s| self.boolean(&acc, s, BooleanType::Union))
    }

    /// Apply fillet (rounded edge) to a group of edges
    fn fillet(&self, solid: &Solid, edges: EdgeSelector, radius: f64) -> CadResult<Solid>;

    /// Apply chamfer (beveled edge) to a group of edges
    fn chamfer(&self, solid: &Solid, edges: EdgeSelector, distance: f64) -> CadResult<Solid>;

    /// Move a solid
    fn translate(&self, solid: &Solid, offset: DVec3) -> CadResult<Solid>;

    /// Rotate a solid by `angle` radians around an axis (right-hand rule)
    fn rotate(&self, solid: &Solid, axis: &Axis3D, angle: f64) -> CadResult<Solid>;

    /// Create a box primitive
    fn create_box(&self, center: DVec3, size: DVec3) -> CadResult<Solid>;

    /// Create a cylinder primitive starting at `base` and extending along `axis`
    fn create_cylinder(
        &self,
        base: DVec3,
        radius: f64,
        height: f64,
        axis: DVec3,
    ) -> CadResult<Solid>;

    /// Create a sphere primitive
    fn create_sphere(&self, center: DVec3, radius: f64) -> CadResult<Solid>;

    // ========== Query Methods ==========

    /// Axis-aligned bounds of a solid
    fn bounding_box(&self, solid: &Solid) -> CadResult<BoundingBox>;

    /// Enclosed volume of a solid
    fn volume(&self, solid: &Solid) -> CadResult<f64>;

    /// Whether `point` lies strictly inside the solid
    fn contains_point(&self, solid: &Solid, point: DVec3) -> CadResult<bool>;

    /// Tessellate a solid into triangles
    ///
    /// # Arguments
    /// * `solid` - The solid to tessellate
    /// * `tolerance` - The tessellation tolerance (lower = more triangles)
    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh>;
}

/// A null kernel that always returns errors (used when no kernel is available)
#[derive(Debug, Default)]
pub struct NullKernel;

fn not_available<T>() -> CadResult<T> {
    Err(CadError::KernelNotAvailable(
        "No CAD kernel available".into(),
    ))
}

impl CadKernel for NullKernel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn extrude(&self, _profile: &Wire2D, _plane: &SketchPlane, _distance: f64) -> CadResult<Solid> {
        not_available()
    }

    fn revolve(
        &self,
        _profile: &Wire2D,
        _plane: &SketchPlane,
        _axis: &Axis3D,
        _angle: f64,
    ) -> CadResult<Solid> {
        not_available()
    }

    fn loft(&self, _sections: &[(Wire2D, SketchPlane)], _ruled: bool) -> CadResult<Solid> {
        not_available()
    }

    fn boolean(&self, _a: &Solid, _b: &Solid, _op: BooleanType) -> CadResult<Solid> {
        not_available()
    }

    fn fillet(&self, _solid: &Solid, _edges: EdgeSelector, _radius: f64) -> CadResult<Solid> {
        not_available()
    }

    fn chamfer(&self, _solid: &Solid, _edges: EdgeSelector, _distance: f64) -> CadResult<Solid> {
        not_available()
    }

    fn translate(&self, _solid: &Solid, _offset: DVec3) -> CadResult<Solid> {
        not_available()
    }

    fn rotate(&self, _solid: &Solid, _axis: &Axis3D, _angle: f64) -> CadResult<Solid> {
        not_available()
    }

    fn create_box(&self, _center: DVec3, _size: DVec3) -> CadResult<Solid> {
        not_available()
    }

    fn create_cylinder(
        &self,
        _base: DVec3,
        _radius: f64,
        _height: f64,
        _axis: DVec3,
    ) -> CadResult<Solid> {
        not_available()
    }

    fn create_sphere(&self, _center: DVec3, _radius: f64) -> CadResult<Solid> {
        not_available()
    }

    fn bounding_box(&self, _solid: &Solid) -> CadResult<BoundingBox> {
        not_available()
    }

    fn volume(&self, _solid: &Solid) -> CadResult<f64> {
        not_available()
    }

    fn contains_point(&self, _solid: &Solid, _point: DVec3) -> CadResult<bool> {
        not_available()
    }

    fn tessellate(&self, _solid: &Solid, _tolerance: f64) -> CadResult<TessellatedMesh> {
        not_available()
    }
}

/// Get the default CAD kernel
pub fn default_kernel() -> Box<dyn CadKernel> {
    Box::new(super::ImplicitKernel::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_chamfered_rect_has_nine_points() {
        let wire = Wire2D::chamfered_rect(4.0, 2.0, 0.5, 0.25);
        assert_eq!(wire.points.len(), 9);
        assert_eq!(wire.points[0], wire.points[8], "outline must be closed");
        assert_eq!(wire.points[0], DVec2::new(-2.0, -0.5));
        assert_eq!(wire.points[7], DVec2::new(-1.5, -1.0));
        assert_eq!(wire.loop_points().len(), 8);
    }

    #[test]
    fn test_chamfered_rect_area() {
        let wire = Wire2D::chamfered_rect(4.0, 2.0, 0.5, 0.25);
        let expected = 8.0 - 0.5 * 0.5 * 0.5 - 3.0 * 0.5 * 0.25 * 0.25;
        assert_relative_eq!(wire.signed_area().abs(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_rectangle_winding() {
        let wire = Wire2D::rectangle(DVec2::ZERO, 2.0, 3.0);
        assert_relative_eq!(wire.signed_area(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(wire.mirrored_x().signed_area(), -6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounding_box_ops() {
        let a = BoundingBox::new(DVec3::ZERO, DVec3::ONE);
        let b = BoundingBox::new(DVec3::splat(0.5), DVec3::splat(2.0));
        assert_eq!(a.union(&b).max, DVec3::splat(2.0));
        assert_eq!(a.intersection(&b).map(|i| i.min), Some(DVec3::splat(0.5)));

        let far = BoundingBox::new(DVec3::splat(3.0), DVec3::splat(4.0));
        assert!(a.intersection(&far).is_none());
        assert_relative_eq!(a.distance(DVec3::new(2.0, 0.5, 0.5)), 1.0);
        assert_eq!(a.distance(DVec3::splat(0.5)), 0.0);
    }

    #[test]
    fn test_bounding_box_rotated() {
        let bb = BoundingBox::new(DVec3::new(0.0, -1.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        let rotated = bb.transformed(&Axis3D::z().rotation(std::f64::consts::FRAC_PI_2));
        assert_relative_eq!(rotated.min.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(rotated.max.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_null_kernel_reports_unavailable() {
        let kernel = NullKernel;
        assert!(!kernel.is_available());
        let result = kernel.create_box(DVec3::ZERO, DVec3::ONE);
        assert!(matches!(result, Err(CadError::KernelNotAvailable(_))));
        assert!(kernel.union_all(&[]).is_err());
    }

    #[test]
    fn test_mesh_merge_reindexes() {
        let mut a = TessellatedMesh {
            vertices: vec![[0.0; 3]; 3],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        };
        let b = a.clone();
        a.merge(&b);
        assert_eq!(a.triangle_count(), 2);
        assert_eq!(&a.indices[3..], &[3, 4, 5]);
    }
}
