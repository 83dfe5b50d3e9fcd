//! Implicit CAD Kernel Backend
//!
//! Pure Rust kernel that keeps every solid as an immutable CSG tree and
//! evaluates it as a signed distance field. Booleans never fail on
//! coincident faces, and fillets on prismatic and lofted solids are
//! modelled exactly on the profile.
//!
//! Note: volume is estimated by grid sampling and tessellation is a
//! marching-tetrahedra approximation; both converge with resolution.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DAffine3, DVec2, DVec3};
use parking_lot::RwLock;
use tracing::trace;
use uuid::Uuid;

use super::mesher;
use super::shape::{EdgeTreatment, Loft, Revolution, Section, Shape};
use super::{
    Axis3D, BooleanType, BoundingBox, CadError, CadKernel, CadResult, EdgeSelector, Solid,
    TessellatedMesh, Wire2D,
};
use crate::sketch::SketchPlane;

/// Default sampling cells per axis for volume estimation
pub const DEFAULT_VOLUME_RESOLUTION: usize = 64;

/// Default upper bound on tessellation grid cells
pub const DEFAULT_MAX_CELLS: usize = 1 << 23;

const EPS: f64 = 1e-9;

/// Signed-distance based CAD kernel
///
/// Every operation stores a new shape and nothing is freed on its own.
/// Use one kernel per component, or [`ImplicitKernel::clear`] it between
/// components; solids created before a clear become unknown.
pub struct ImplicitKernel {
    /// Storage for solid data (keyed by UUID)
    shapes: RwLock<HashMap<Uuid, Arc<Shape>>>,
    volume_resolution: usize,
    max_cells: usize,
}

impl ImplicitKernel {
    /// Create a new implicit kernel
    pub fn new() -> Self {
        Self {
            shapes: RwLock::new(HashMap::new()),
            volume_resolution: DEFAULT_VOLUME_RESOLUTION,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }

    /// Set the number of sampling cells per axis used by [`CadKernel::volume`]
    pub fn with_volume_resolution(mut self, cells_per_axis: usize) -> Self {
        self.volume_resolution = cells_per_axis.max(1);
        self
    }

    /// Cap the number of cells a tessellation grid may use
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells.max(1);
        self
    }

    /// Number of solids held by this kernel
    pub fn solid_count(&self) -> usize {
        self.shapes.read().len()
    }

    /// Drop every stored solid
    pub fn clear(&self) {
        self.shapes.write().clear();
    }

    /// Store a shape and return a Solid reference
    fn store(&self, shape: Shape) -> Solid {
        let id = Uuid::new_v4();
        self.shapes.write().insert(id, Arc::new(shape));
        Solid::new(id)
    }

    /// Get a stored shape by its solid handle
    fn shape(&self, solid: &Solid) -> CadResult<Arc<Shape>> {
        self.shapes.read().get(&solid.id).cloned().ok_or_else(|| {
            CadError::OperationFailed(format!("Solid {} is unknown to this kernel", solid.id))
        })
    }

    fn with_treatment(
        &self,
        solid: &Solid,
        edges: EdgeSelector,
        treatment: EdgeTreatment,
    ) -> CadResult<Solid> {
        let shape = self.shape(solid)?;
        Ok(self.store(shape.with_edges(edges, treatment)?))
    }
}

impl Default for ImplicitKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertices of a closed, non-degenerate profile
fn profile_polygon(profile: &Wire2D) -> CadResult<Vec<DVec2>> {
    if !profile.closed {
        return Err(CadError::InvalidProfile("Profile must be closed".into()));
    }
    let points = profile.loop_points();
    if points.len() < 3 {
        return Err(CadError::InvalidProfile(format!(
            "Profile needs at least 3 points, got {}",
            points.len()
        )));
    }
    if points.iter().any(|p| !p.is_finite()) {
        return Err(CadError::InvalidProfile("Profile has non-finite points".into()));
    }
    let area = profile.signed_area();
    if area.abs() < 1e-12 {
        return Err(CadError::InvalidProfile("Profile encloses no area".into()));
    }
    Ok(points.to_vec())
}

fn ensure_positive(what: &str, value: f64) -> CadResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(CadError::OperationFailed(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

impl CadKernel for ImplicitKernel {
    fn name(&self) -> &str {
        "implicit"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extrude(&self, profile: &Wire2D, plane: &SketchPlane, distance: f64) -> CadResult<Solid> {
        let polygon = profile_polygon(profile)?;
        if distance.abs() < EPS || !distance.is_finite() {
            return Err(CadError::InvalidProfile(format!(
                "Extrusion distance must be non-zero, got {distance}"
            )));
        }
        let (w0, w1) = if distance > 0.0 {
            (0.0, distance)
        } else {
            (distance, 0.0)
        };
        trace!(points = polygon.len(), distance, "extrude");
        let loft = Loft::new(
            *plane,
            vec![
                Section {
                    polygon: polygon.clone(),
                    offset: w0,
                },
                Section {
                    polygon,
                    offset: w1,
                },
            ],
        );
        Ok(self.store(Shape::loft(loft)))
    }

    fn revolve(
        &self,
        profile: &Wire2D,
        plane: &SketchPlane,
        axis: &Axis3D,
        angle: f64,
    ) -> CadResult<Solid> {
        let polygon = profile_polygon(profile)?;
        if !(angle > EPS && angle <= std::f64::consts::TAU + EPS) {
            return Err(CadError::OperationFailed(format!(
                "Revolve angle must be in (0, 2π], got {angle}"
            )));
        }
        let direction = axis.direction;
        if direction.dot(plane.normal).abs() > 1e-6 || plane.to_local(axis.origin).z.abs() > 1e-6
        {
            return Err(CadError::InvalidProfile(
                "Revolve axis must lie in the sketch plane".into(),
            ));
        }

        let mut radial = direction.cross(plane.normal);
        let to_rh = |radial: DVec3| -> Vec<DVec2> {
            polygon
                .iter()
                .map(|p| {
                    let d = plane.to_world(*p) - axis.origin;
                    DVec2::new(d.dot(radial), d.dot(direction))
                })
                .collect()
        };
        let mut rh = to_rh(radial);
        let (min_r, max_r) = rh
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        if min_r < -1e-9 && max_r > 1e-9 {
            return Err(CadError::InvalidProfile(
                "Revolve profile crosses the axis".into(),
            ));
        }
        if max_r <= 1e-9 {
            radial = -radial;
            rh = to_rh(radial);
        }

        let revolution = Revolution {
            origin: axis.origin,
            axis: direction,
            radial,
            profile: rh,
            angle: angle.min(std::f64::consts::TAU),
        };
        Ok(self.store(Shape::revolution(revolution)))
    }

    fn loft(&self, sections: &[(Wire2D, SketchPlane)], ruled: bool) -> CadResult<Solid> {
        if !ruled {
            return Err(CadError::OperationFailed(
                "Only ruled lofts are supported".into(),
            ));
        }
        let Some((_, base)) = sections.first() else {
            return Err(CadError::InvalidProfile("Loft needs sections".into()));
        };
        if sections.len() < 2 {
            return Err(CadError::InvalidProfile(
                "Loft needs at least two sections".into(),
            ));
        }

        let mut built = Vec::with_capacity(sections.len());
        for (wire, plane) in sections {
            if !plane.is_parallel_to(base) {
                return Err(CadError::InvalidProfile(
                    "Loft sections must lie on parallel planes".into(),
                ));
            }
            let shift = base.to_local(plane.origin);
            let polygon = profile_polygon(wire)?
                .into_iter()
                .map(|p| p + shift.truncate())
                .collect::<Vec<_>>();
            built.push(Section {
                polygon,
                offset: shift.z,
            });
        }

        let count = built[0].polygon.len();
        if built.iter().any(|s| s.polygon.len() != count) {
            return Err(CadError::InvalidProfile(
                "Loft sections must have the same number of points".into(),
            ));
        }

        let ascending = built.windows(2).all(|w| w[1].offset >= w[0].offset - EPS);
        let descending = built.windows(2).all(|w| w[1].offset <= w[0].offset + EPS);
        if !ascending && descending {
            built.reverse();
        } else if !ascending {
            return Err(CadError::InvalidProfile(
                "Loft sections must be ordered along the normal".into(),
            ));
        }
        let height = built[built.len() - 1].offset - built[0].offset;
        if height < EPS {
            return Err(CadError::InvalidProfile("Loft has zero height".into()));
        }

        trace!(sections = built.len(), points = count, "loft");
        Ok(self.store(Shape::loft(Loft::new(*base, built))))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let (sa, sb) = (self.shape(a)?, self.shape(b)?);
        let shape = match op {
            BooleanType::Union => Shape::union([sa, sb]),
            BooleanType::Subtract => Shape::subtract(sa, sb),
            BooleanType::Intersect => Shape::intersect(sa, sb).ok_or_else(|| {
                CadError::BooleanFailed("Intersection of disjoint solids is empty".into())
            })?,
        };
        Ok(self.store(shape))
    }

    fn union_all(&self, solids: &[Solid]) -> CadResult<Solid> {
        if solids.is_empty() {
            return Err(CadError::OperationFailed("Union of zero solids".into()));
        }
        let shapes = solids
            .iter()
            .map(|s| self.shape(s))
            .collect::<CadResult<Vec<_>>>()?;
        Ok(self.store(Shape::union(shapes)))
    }

    fn fillet(&self, solid: &Solid, edges: EdgeSelector, radius: f64) -> CadResult<Solid> {
        self.with_treatment(solid, edges, EdgeTreatment::Fillet(radius))
    }

    fn chamfer(&self, solid: &Solid, edges: EdgeSelector, distance: f64) -> CadResult<Solid> {
        self.with_treatment(solid, edges, EdgeTreatment::Chamfer(distance))
    }

    fn translate(&self, solid: &Solid, offset: DVec3) -> CadResult<Solid> {
        let shape = self.shape(solid)?;
        Ok(self.store(Shape::transformed(
            shape,
            DAffine3::from_translation(offset),
        )))
    }

    fn rotate(&self, solid: &Solid, axis: &Axis3D, angle: f64) -> CadResult<Solid> {
        let shape = self.shape(solid)?;
        Ok(self.store(Shape::transformed(shape, axis.rotation(angle))))
    }

    fn create_box(&self, center: DVec3, size: DVec3) -> CadResult<Solid> {
        ensure_positive("Box width", size.x)?;
        ensure_positive("Box depth", size.y)?;
        ensure_positive("Box height", size.z)?;
        let plane = SketchPlane::xy().at(center - DVec3::Z * (size.z / 2.0));
        self.extrude(&Wire2D::rectangle(DVec2::ZERO, size.x, size.y), &plane, size.z)
    }

    fn create_cylinder(
        &self,
        base: DVec3,
        radius: f64,
        height: f64,
        axis: DVec3,
    ) -> CadResult<Solid> {
        ensure_positive("Cylinder radius", radius)?;
        ensure_positive("Cylinder height", height)?;
        let direction = axis.try_normalize().ok_or_else(|| {
            CadError::OperationFailed("Cylinder axis must be non-zero".into())
        })?;
        let revolution = Revolution {
            origin: base,
            axis: direction,
            radial: direction.any_orthonormal_vector(),
            profile: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(radius, 0.0),
                DVec2::new(radius, height),
                DVec2::new(0.0, height),
            ],
            angle: std::f64::consts::TAU,
        };
        Ok(self.store(Shape::revolution(revolution)))
    }

    fn create_sphere(&self, center: DVec3, radius: f64) -> CadResult<Solid> {
        ensure_positive("Sphere radius", radius)?;
        Ok(self.store(Shape::sphere(center, radius)))
    }

    fn bounding_box(&self, solid: &Solid) -> CadResult<BoundingBox> {
        Ok(self.shape(solid)?.bounds)
    }

    fn volume(&self, solid: &Solid) -> CadResult<f64> {
        let shape = self.shape(solid)?;
        let bounds = shape.bounds;
        let n = self.volume_resolution;
        let cell = bounds.size() / n as f64;
        if cell.min_element() <= 0.0 {
            return Ok(0.0);
        }
        let mut inside = 0usize;
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    let p = bounds.min
                        + DVec3::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5) * cell;
                    if shape.distance(p) < 0.0 {
                        inside += 1;
                    }
                }
            }
        }
        Ok(inside as f64 * cell.x * cell.y * cell.z)
    }

    fn contains_point(&self, solid: &Solid, point: DVec3) -> CadResult<bool> {
        Ok(self.shape(solid)?.distance(point) < 0.0)
    }

    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh> {
        let shape = self.shape(solid)?;
        mesher::tessellate(&shape, tolerance, self.max_cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    fn unit_box(kernel: &ImplicitKernel) -> Solid {
        kernel
            .create_box(DVec3::ZERO, DVec3::ONE)
            .expect("box should build")
    }

    #[test]
    fn test_box_bounds_and_volume() {
        let kernel = ImplicitKernel::new();
        let solid = kernel
            .create_box(DVec3::new(0.0, 0.0, 1.0), DVec3::new(2.0, 3.0, 4.0))
            .unwrap();
        let bb = kernel.bounding_box(&solid).unwrap();
        assert_eq!(bb.min, DVec3::new(-1.0, -1.5, -1.0));
        assert_eq!(bb.max, DVec3::new(1.0, 1.5, 3.0));
        assert_relative_eq!(kernel.volume(&solid).unwrap(), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_extrude_goes_against_normal() {
        let kernel = ImplicitKernel::new();
        let wire = Wire2D::rectangle(DVec2::ZERO, 1.0, 1.0);
        let solid = kernel.extrude(&wire, &SketchPlane::xz(), -2.0).unwrap();
        let bb = kernel.bounding_box(&solid).unwrap();
        // xz normal is -Y, so a negative distance extrudes towards +Y
        assert_relative_eq!(bb.min.y, 0.0);
        assert_relative_eq!(bb.max.y, 2.0);
    }

    #[test]
    fn test_invalid_profiles() {
        let kernel = ImplicitKernel::new();
        let open = Wire2D::new(vec![DVec2::ZERO, DVec2::X, DVec2::Y], false);
        assert!(matches!(
            kernel.extrude(&open, &SketchPlane::xy(), 1.0),
            Err(CadError::InvalidProfile(_))
        ));
        let flat = Wire2D::new(vec![DVec2::ZERO, DVec2::X, DVec2::X * 2.0], true);
        assert!(kernel.extrude(&flat, &SketchPlane::xy(), 1.0).is_err());
        let square = Wire2D::rectangle(DVec2::ZERO, 1.0, 1.0);
        assert!(kernel.extrude(&square, &SketchPlane::xy(), 0.0).is_err());
    }

    #[test]
    fn test_subtract_and_contains() {
        let kernel = ImplicitKernel::new();
        let outer = kernel.create_box(DVec3::ZERO, DVec3::splat(2.0)).unwrap();
        let inner = unit_box(&kernel);
        let shell = kernel.boolean(&outer, &inner, BooleanType::Subtract).unwrap();
        assert!(!kernel.contains_point(&shell, DVec3::ZERO).unwrap());
        assert!(kernel.contains_point(&shell, DVec3::splat(0.75)).unwrap());
        assert_relative_eq!(kernel.volume(&shell).unwrap(), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disjoint_intersection_fails() {
        let kernel = ImplicitKernel::new();
        let a = unit_box(&kernel);
        let b = kernel
            .create_box(DVec3::new(5.0, 0.0, 0.0), DVec3::ONE)
            .unwrap();
        assert!(matches!(
            kernel.boolean(&a, &b, BooleanType::Intersect),
            Err(CadError::BooleanFailed(_))
        ));
    }

    #[test]
    fn test_union_all_bounds() {
        let kernel = ImplicitKernel::new();
        let solids: Vec<Solid> = (0..4)
            .map(|i| {
                kernel
                    .create_box(DVec3::new(i as f64 * 2.0, 0.0, 0.0), DVec3::ONE)
                    .unwrap()
            })
            .collect();
        let all = kernel.union_all(&solids).unwrap();
        let bb = kernel.bounding_box(&all).unwrap();
        assert_relative_eq!(bb.min.x, -0.5);
        assert_relative_eq!(bb.max.x, 6.5);
        assert!(kernel.contains_point(&all, DVec3::new(4.0, 0.0, 0.0)).unwrap());
        assert!(!kernel.contains_point(&all, DVec3::new(1.0, 0.0, 0.0)).unwrap());
    }

    #[test]
    fn test_rotate_about_offset_axis() {
        let kernel = ImplicitKernel::new();
        let solid = kernel
            .create_box(DVec3::new(2.0, 0.0, 0.0), DVec3::ONE)
            .unwrap();
        let axis = Axis3D::new(DVec3::new(1.0, 0.0, 0.0), DVec3::Z);
        let rotated = kernel.rotate(&solid, &axis, PI).unwrap();
        let bb = kernel.bounding_box(&rotated).unwrap();
        assert_relative_eq!(bb.center().x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_volume() {
        let kernel = ImplicitKernel::new().with_volume_resolution(128);
        let cyl = kernel
            .create_cylinder(DVec3::ZERO, 1.0, 2.0, DVec3::Z)
            .unwrap();
        let bb = kernel.bounding_box(&cyl).unwrap();
        assert_relative_eq!(bb.max.z, 2.0, epsilon = 1e-12);
        assert_relative_eq!(bb.max.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.volume(&cyl).unwrap(), 2.0 * PI, epsilon = 0.05);
    }

    #[test]
    fn test_revolve_partial_ring() {
        let kernel = ImplicitKernel::new();
        // ring section between r = 1 and r = 2 on the XZ plane
        let wire = Wire2D::rectangle(DVec2::new(1.5, 0.5), 1.0, 1.0);
        let solid = kernel
            .revolve(&wire, &SketchPlane::xz(), &Axis3D::z(), FRAC_PI_2)
            .unwrap();
        assert!(kernel.contains_point(&solid, DVec3::new(1.5, 0.1, 0.5)).unwrap());
        assert!(kernel.contains_point(&solid, DVec3::new(0.1, 1.5, 0.5)).unwrap());
        assert!(!kernel.contains_point(&solid, DVec3::new(-1.5, 0.1, 0.5)).unwrap());
        assert!(!kernel.contains_point(&solid, DVec3::new(0.5, 0.5, 0.5)).unwrap());
    }

    #[test]
    fn test_revolve_rejects_crossing_profile() {
        let kernel = ImplicitKernel::new();
        let wire = Wire2D::rectangle(DVec2::ZERO, 1.0, 1.0);
        let result = kernel.revolve(&wire, &SketchPlane::xz(), &Axis3D::z(), TAU);
        assert!(matches!(result, Err(CadError::InvalidProfile(_))));
    }

    #[test]
    fn test_loft_frustum() {
        let kernel = ImplicitKernel::new();
        let base = SketchPlane::xy();
        let sections = vec![
            (Wire2D::rectangle(DVec2::ZERO, 2.0, 2.0), base),
            (Wire2D::rectangle(DVec2::ZERO, 1.0, 1.0), base.offset(1.0)),
        ];
        let solid = kernel.loft(&sections, true).unwrap();
        assert!(kernel.contains_point(&solid, DVec3::new(0.7, 0.0, 0.2)).unwrap());
        assert!(!kernel.contains_point(&solid, DVec3::new(0.7, 0.0, 0.9)).unwrap());
        // frustum of a square pyramid: h/3 (A1 + A2 + sqrt(A1 A2))
        let expected = (4.0 + 1.0 + 2.0) / 3.0;
        assert_relative_eq!(kernel.volume(&solid).unwrap(), expected, epsilon = 0.02);
        assert!(kernel.loft(&sections, false).is_err());
    }

    #[test]
    fn test_loft_mismatched_sections() {
        let kernel = ImplicitKernel::new();
        let sections = vec![
            (Wire2D::rectangle(DVec2::ZERO, 2.0, 2.0), SketchPlane::xy()),
            (
                Wire2D::chamfered_rect(1.0, 1.0, 0.1, 0.1),
                SketchPlane::xy().offset(1.0),
            ),
        ];
        assert!(kernel.loft(&sections, true).is_err());
    }

    #[test]
    fn test_fillet_through_transform() {
        let kernel = ImplicitKernel::new();
        let solid = kernel
            .translate(&unit_box(&kernel), DVec3::new(3.0, 0.0, 0.0))
            .unwrap();
        let rounded = kernel.fillet(&solid, EdgeSelector::Lateral, 0.2).unwrap();
        assert!(!kernel
            .contains_point(&rounded, DVec3::new(3.49, 0.49, 0.0))
            .unwrap());
        assert!(kernel.fillet(&solid, EdgeSelector::Top, 0.8).is_err());
    }

    #[test]
    fn test_fillet_on_boolean_fails() {
        let kernel = ImplicitKernel::new();
        let a = unit_box(&kernel);
        let u = kernel.union_all(&[a, a]).unwrap();
        assert!(matches!(
            kernel.fillet(&u, EdgeSelector::Top, 0.1),
            Err(CadError::OperationFailed(_))
        ));
    }

    #[test]
    fn test_foreign_solid_rejected() {
        let a = ImplicitKernel::new();
        let b = ImplicitKernel::new();
        let solid = unit_box(&a);
        assert!(b.volume(&solid).is_err());
        assert_eq!(a.solid_count(), 1);
    }

    #[test]
    fn test_clear_forgets_solids() {
        let kernel = ImplicitKernel::new();
        let solid = unit_box(&kernel);
        kernel.translate(&solid, DVec3::X).unwrap();
        assert_eq!(kernel.solid_count(), 2);
        kernel.clear();
        assert_eq!(kernel.solid_count(), 0);
        assert!(kernel.volume(&solid).is_err());
        let again = unit_box(&kernel);
        assert_relative_eq!(kernel.volume(&again).unwrap(), 1.0, epsilon = 0.05);
    }

    #[test]
    fn test_tessellate_box_covers_bounds() {
        let kernel = ImplicitKernel::new();
        let solid = unit_box(&kernel);
        let mesh = kernel.tessellate(&solid, 0.1).unwrap();
        assert!(mesh.triangle_count() > 0);
        for v in &mesh.vertices {
            assert!(v.iter().all(|c| c.abs() <= 0.5 + 1e-4));
        }
    }
}
