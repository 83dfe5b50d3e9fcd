//! Immutable CSG trees evaluated as signed distance fields.
//!
//! Distances are exact for boxes and spheres and a close bound elsewhere;
//! the sign is always exact, which is what volume, containment and meshing
//! rely on.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use glam::{DAffine3, DVec2, DVec3};

use super::traits::{BoundingBox, CadError, CadResult, EdgeSelector};
use crate::sketch::SketchPlane;
use crate::sketch::path::{CORNER_SEGMENTS, round_corner, tangent_length};

const EPS: f64 = 1e-9;

/// Treatment of the edges around one end face of a loft
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum EdgeTreatment {
    Sharp,
    Fillet(f64),
    Chamfer(f64),
}

impl EdgeTreatment {
    fn size(&self) -> f64 {
        match *self {
            EdgeTreatment::Sharp => 0.0,
            EdgeTreatment::Fillet(r) | EdgeTreatment::Chamfer(r) => r,
        }
    }

    /// Inward offset of the side wall at `depth` into the treated band
    fn inset(&self, depth: f64) -> f64 {
        match *self {
            EdgeTreatment::Sharp => 0.0,
            EdgeTreatment::Fillet(r) => {
                let t = r - depth.clamp(0.0, r);
                r - (r * r - t * t).max(0.0).sqrt()
            }
            EdgeTreatment::Chamfer(d) => d - depth.clamp(0.0, d),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub polygon: Vec<DVec2>,
    /// Height along the loft plane normal
    pub offset: f64,
}

/// Ruled loft (or prism) through sections ordered by increasing offset
#[derive(Debug, Clone)]
pub(crate) struct Loft {
    pub plane: SketchPlane,
    pub sections: Vec<Section>,
    pub top: EdgeTreatment,
    pub bottom: EdgeTreatment,
}

impl Loft {
    pub fn new(plane: SketchPlane, sections: Vec<Section>) -> Self {
        Self {
            plane,
            sections,
            top: EdgeTreatment::Sharp,
            bottom: EdgeTreatment::Sharp,
        }
    }

    fn bottom_offset(&self) -> f64 {
        self.sections.first().map_or(0.0, |s| s.offset)
    }

    fn top_offset(&self) -> f64 {
        self.sections.last().map_or(0.0, |s| s.offset)
    }

    fn distance(&self, p: DVec3) -> f64 {
        let local = self.plane.to_local(p);
        let uv = DVec2::new(local.x, local.y);
        let w = local.z;
        let (w0, w1) = (self.bottom_offset(), self.top_offset());

        let top_depth = w1 - w;
        let bottom_depth = w - w0;
        let inset = self.top.inset(top_depth).max(self.bottom.inset(bottom_depth));

        let lateral = self.section_distance(uv, w) + inset;
        let axial = (w0 - w).max(w - w1);
        let outside = DVec2::new(lateral.max(0.0), axial.max(0.0)).length();
        outside + lateral.max(axial).min(0.0)
    }

    fn section_distance(&self, uv: DVec2, w: f64) -> f64 {
        let w = w.clamp(self.bottom_offset(), self.top_offset());
        let segment = self
            .sections
            .windows(2)
            .find(|pair| pair[1].offset - pair[0].offset > EPS && w <= pair[1].offset)
            .or_else(|| self.sections.windows(2).last());
        let Some([a, b]) = segment else {
            return f64::INFINITY;
        };
        let height = b.offset - a.offset;
        let t = if height > EPS {
            ((w - a.offset) / height).clamp(0.0, 1.0)
        } else {
            1.0
        };
        polygon_distance(a.polygon.len(), |k| a.polygon[k].lerp(b.polygon[k], t), uv)
    }

    fn bounds(&self) -> BoundingBox {
        let points = self.sections.iter().flat_map(|s| {
            s.polygon
                .iter()
                .map(move |v| self.plane.to_world(*v) + self.plane.normal * s.offset)
        });
        BoundingBox::from_points(points).unwrap_or(BoundingBox::new(DVec3::ZERO, DVec3::ZERO))
    }

    fn fillet_lateral(&self, radius: f64) -> CadResult<Loft> {
        let mut sections = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let poly = &section.polygon;
            let n = poly.len();
            let tangents: Vec<f64> = (0..n)
                .map(|i| tangent_length(poly[(i + n - 1) % n], poly[i], poly[(i + 1) % n], radius))
                .collect();
            check_edge_budget(poly, &tangents, "fillet", radius)?;
            let rounded = (0..n)
                .flat_map(|i| {
                    round_corner(
                        poly[(i + n - 1) % n],
                        poly[i],
                        poly[(i + 1) % n],
                        radius,
                        CORNER_SEGMENTS,
                    )
                })
                .collect();
            sections.push(Section {
                polygon: rounded,
                offset: section.offset,
            });
        }
        Ok(Loft {
            sections,
            ..self.clone()
        })
    }

    fn chamfer_lateral(&self, distance: f64) -> CadResult<Loft> {
        let mut sections = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let poly = &section.polygon;
            let n = poly.len();
            let budget = vec![distance; n];
            check_edge_budget(poly, &budget, "chamfer", distance)?;
            let cut = (0..n)
                .flat_map(|i| {
                    let (prev, cur, next) = (poly[(i + n - 1) % n], poly[i], poly[(i + 1) % n]);
                    let d1 = (prev - cur).try_normalize().unwrap_or(DVec2::ZERO);
                    let d2 = (next - cur).try_normalize().unwrap_or(DVec2::ZERO);
                    [cur + d1 * distance, cur + d2 * distance]
                })
                .collect();
            sections.push(Section {
                polygon: cut,
                offset: section.offset,
            });
        }
        Ok(Loft {
            sections,
            ..self.clone()
        })
    }

    fn treat_end(&self, top: bool, treatment: EdgeTreatment) -> CadResult<Loft> {
        let size = treatment.size();
        let other = if top { self.bottom.size() } else { self.top.size() };
        let height = self.top_offset() - self.bottom_offset();
        if size + other >= height {
            return Err(CadError::OperationFailed(format!(
                "Edge treatment {size} does not fit in solid height {height:.4}"
            )));
        }
        let end = if top {
            self.sections.last()
        } else {
            self.sections.first()
        };
        let extent = end
            .and_then(|s| {
                let pts = s.polygon.iter().map(|p| p.extend(0.0));
                BoundingBox::from_points(pts)
            })
            .map_or(0.0, |bb| bb.size().x.min(bb.size().y));
        if size * 2.0 >= extent {
            return Err(CadError::OperationFailed(format!(
                "Edge treatment {size} too large for end face of width {extent:.4}"
            )));
        }
        let mut loft = self.clone();
        if top {
            loft.top = treatment;
        } else {
            loft.bottom = treatment;
        }
        Ok(loft)
    }
}

fn check_edge_budget(poly: &[DVec2], used: &[f64], what: &str, size: f64) -> CadResult<()> {
    let n = poly.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let edge = poly[i].distance(poly[j]);
        // zero-length edges carry no corner on either side
        if edge > EPS && used[i] + used[j] > edge + 1e-9 {
            return Err(CadError::OperationFailed(format!(
                "Lateral {what} of {size} exceeds edge length {edge:.4}"
            )));
        }
    }
    Ok(())
}

/// A closed `(radius, height)` profile swept around an axis
#[derive(Debug, Clone)]
pub(crate) struct Revolution {
    pub origin: DVec3,
    pub axis: DVec3,
    /// Direction of zero angle, perpendicular to `axis`
    pub radial: DVec3,
    pub profile: Vec<DVec2>,
    pub angle: f64,
}

impl Revolution {
    fn tangent(&self) -> DVec3 {
        self.axis.cross(self.radial)
    }

    fn is_full(&self) -> bool {
        self.angle >= TAU - EPS
    }

    fn distance(&self, p: DVec3) -> f64 {
        let d = p - self.origin;
        let h = d.dot(self.axis);
        let x = d.dot(self.radial);
        let y = d.dot(self.tangent());
        let rho = x.hypot(y);
        let profile = polygon_distance(self.profile.len(), |k| self.profile[k], DVec2::new(rho, h));
        if self.is_full() {
            return profile;
        }

        let phi = y.atan2(x).rem_euclid(TAU);
        let inside = phi <= self.angle;
        let (to_start, to_end) = if inside {
            (phi, self.angle - phi)
        } else {
            (TAU - phi, phi - self.angle)
        };
        let plane_distance = |delta: f64| {
            if delta < FRAC_PI_2 {
                rho * delta.sin()
            } else {
                rho
            }
        };
        let wedge = plane_distance(to_start).min(plane_distance(to_end));
        profile.max(if inside { -wedge } else { wedge })
    }

    fn point_at(&self, rh: DVec2, phi: f64) -> DVec3 {
        self.origin
            + self.axis * rh.y
            + (self.radial * phi.cos() + self.tangent() * phi.sin()) * rh.x
    }

    fn bounds(&self) -> BoundingBox {
        let tangent = self.tangent();
        let mut angles = vec![0.0, self.angle];
        for i in 0..3 {
            let crest = tangent[i].atan2(self.radial[i]).rem_euclid(TAU);
            for candidate in [crest, (crest + std::f64::consts::PI).rem_euclid(TAU)] {
                if candidate <= self.angle {
                    angles.push(candidate);
                }
            }
        }
        let points = self
            .profile
            .iter()
            .flat_map(|rh| angles.iter().map(move |phi| self.point_at(*rh, *phi)));
        BoundingBox::from_points(points).unwrap_or(BoundingBox::new(self.origin, self.origin))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ShapeKind {
    Loft(Loft),
    Revolution(Revolution),
    Sphere { center: DVec3, radius: f64 },
    Union(Vec<Arc<Shape>>),
    Subtract(Arc<Shape>, Arc<Shape>),
    Intersect(Arc<Shape>, Arc<Shape>),
    Transformed {
        shape: Arc<Shape>,
        to_world: DAffine3,
        to_local: DAffine3,
    },
}

/// A CSG node with its cached bounds
#[derive(Debug, Clone)]
pub(crate) struct Shape {
    pub kind: ShapeKind,
    pub bounds: BoundingBox,
}

impl Shape {
    pub fn loft(loft: Loft) -> Self {
        let bounds = loft.bounds();
        Self {
            kind: ShapeKind::Loft(loft),
            bounds,
        }
    }

    pub fn revolution(revolution: Revolution) -> Self {
        let bounds = revolution.bounds();
        Self {
            kind: ShapeKind::Revolution(revolution),
            bounds,
        }
    }

    pub fn sphere(center: DVec3, radius: f64) -> Self {
        Self {
            kind: ShapeKind::Sphere { center, radius },
            bounds: BoundingBox::new(center - DVec3::splat(radius), center + DVec3::splat(radius)),
        }
    }

    /// N-ary union; nested unions are flattened
    pub fn union(children: impl IntoIterator<Item = Arc<Shape>>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match &child.kind {
                ShapeKind::Union(grandchildren) => flat.extend(grandchildren.iter().cloned()),
                _ => flat.push(child),
            }
        }
        let bounds = flat
            .iter()
            .map(|c| c.bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(BoundingBox::new(DVec3::ZERO, DVec3::ZERO));
        Self {
            kind: ShapeKind::Union(flat),
            bounds,
        }
    }

    pub fn subtract(a: Arc<Shape>, b: Arc<Shape>) -> Self {
        let bounds = a.bounds;
        Self {
            kind: ShapeKind::Subtract(a, b),
            bounds,
        }
    }

    /// Intersection, `None` when the operands cannot overlap
    pub fn intersect(a: Arc<Shape>, b: Arc<Shape>) -> Option<Self> {
        let bounds = a.bounds.intersection(&b.bounds)?;
        Some(Self {
            kind: ShapeKind::Intersect(a, b),
            bounds,
        })
    }

    /// Apply a rigid transform, folding into an existing one.
    ///
    /// Revolutions and spheres are moved directly so their bounds stay tight.
    pub fn transformed(shape: Arc<Shape>, transform: DAffine3) -> Self {
        match &shape.kind {
            ShapeKind::Revolution(rev) => {
                return Self::revolution(Revolution {
                    origin: transform.transform_point3(rev.origin),
                    axis: transform.transform_vector3(rev.axis),
                    radial: transform.transform_vector3(rev.radial),
                    profile: rev.profile.clone(),
                    angle: rev.angle,
                });
            }
            ShapeKind::Sphere { center, radius } => {
                return Self::sphere(transform.transform_point3(*center), *radius);
            }
            _ => {}
        }
        let (inner, to_world) = match &shape.kind {
            ShapeKind::Transformed {
                shape: inner,
                to_world,
                ..
            } => (inner.clone(), transform * *to_world),
            _ => (shape.clone(), transform),
        };
        let bounds = inner.bounds.transformed(&to_world);
        Self {
            kind: ShapeKind::Transformed {
                shape: inner,
                to_world,
                to_local: to_world.inverse(),
            },
            bounds,
        }
    }

    /// Signed distance: negative inside, positive outside
    pub fn distance(&self, p: DVec3) -> f64 {
        match &self.kind {
            ShapeKind::Loft(loft) => loft.distance(p),
            ShapeKind::Revolution(rev) => rev.distance(p),
            ShapeKind::Sphere { center, radius } => (p - *center).length() - radius,
            ShapeKind::Union(children) => {
                let mut best = f64::INFINITY;
                for child in children {
                    if child.bounds.distance(p) >= best {
                        continue;
                    }
                    best = best.min(child.distance(p));
                }
                best
            }
            ShapeKind::Subtract(a, b) => {
                let da = a.distance(p);
                if da > 0.0 {
                    return da;
                }
                da.max(-b.distance(p))
            }
            ShapeKind::Intersect(a, b) => {
                let da = a.distance(p);
                if da > 0.0 {
                    return da;
                }
                da.max(b.distance(p))
            }
            ShapeKind::Transformed {
                shape, to_local, ..
            } => shape.distance(to_local.transform_point3(p)),
        }
    }

    /// Fillet or chamfer a group of edges
    pub fn with_edges(&self, edges: EdgeSelector, treatment: EdgeTreatment) -> CadResult<Shape> {
        let size = treatment.size();
        if !(size > 0.0 && size.is_finite()) {
            return Err(CadError::OperationFailed(format!(
                "Fillet/chamfer size must be positive, got {size}"
            )));
        }
        match &self.kind {
            ShapeKind::Loft(loft) => {
                let treated = match (edges, treatment) {
                    (EdgeSelector::Lateral, EdgeTreatment::Fillet(r)) => loft.fillet_lateral(r)?,
                    (EdgeSelector::Lateral, _) => loft.chamfer_lateral(size)?,
                    (EdgeSelector::Top, t) => loft.treat_end(true, t)?,
                    (EdgeSelector::Bottom, t) => loft.treat_end(false, t)?,
                };
                Ok(Shape::loft(treated))
            }
            ShapeKind::Transformed {
                shape, to_world, ..
            } => {
                let inner = shape.with_edges(edges, treatment)?;
                Ok(Shape::transformed(Arc::new(inner), *to_world))
            }
            _ => Err(CadError::OperationFailed(
                "Edge treatment requires an extruded or lofted solid".into(),
            )),
        }
    }
}

/// Signed distance from `p` to a closed polygon of `n` vertices.
///
/// Winding-agnostic. Zero-length edges are tolerated.
pub(crate) fn polygon_distance(n: usize, vertex: impl Fn(usize) -> DVec2, p: DVec2) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    let mut d2 = (p - vertex(0)).length_squared();
    let mut sign = 1.0;
    let mut vj = vertex(n - 1);
    for i in 0..n {
        let vi = vertex(i);
        let e = vj - vi;
        let w = p - vi;
        let len2 = e.length_squared();
        let b = if len2 > 0.0 {
            w - e * (w.dot(e) / len2).clamp(0.0, 1.0)
        } else {
            w
        };
        d2 = d2.min(b.length_squared());

        let c0 = p.y >= vi.y;
        let c1 = p.y < vj.y;
        let c2 = e.x * w.y > e.y * w.x;
        if (c0 && c1 && c2) || (!c0 && !c1 && !c2) {
            sign = -sign;
        }
        vj = vi;
    }
    sign * d2.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<DVec2> {
        let h = size / 2.0;
        vec![
            DVec2::new(-h, -h),
            DVec2::new(h, -h),
            DVec2::new(h, h),
            DVec2::new(-h, h),
        ]
    }

    fn prism(size: f64, height: f64) -> Loft {
        Loft::new(
            SketchPlane::xy(),
            vec![
                Section {
                    polygon: square(size),
                    offset: 0.0,
                },
                Section {
                    polygon: square(size),
                    offset: height,
                },
            ],
        )
    }

    #[test]
    fn test_polygon_distance_sign_and_value() {
        let sq = square(2.0);
        assert_relative_eq!(polygon_distance(4, |k| sq[k], DVec2::ZERO), -1.0);
        assert_relative_eq!(polygon_distance(4, |k| sq[k], DVec2::new(3.0, 0.0)), 2.0);
        let reversed: Vec<DVec2> = sq.iter().rev().copied().collect();
        assert_relative_eq!(polygon_distance(4, |k| reversed[k], DVec2::ZERO), -1.0);
    }

    #[test]
    fn test_prism_distance() {
        let shape = Shape::loft(prism(2.0, 1.0));
        assert!(shape.distance(DVec3::new(0.0, 0.0, 0.5)) < 0.0);
        assert_relative_eq!(shape.distance(DVec3::new(0.0, 0.0, 2.0)), 1.0);
        assert_relative_eq!(shape.distance(DVec3::new(2.0, 0.0, 0.5)), 1.0);
        assert_eq!(shape.bounds.max, DVec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_top_fillet_rounds_edge() {
        let loft = prism(2.0, 1.0);
        let filleted = Shape::loft(loft.treat_end(true, EdgeTreatment::Fillet(0.25)).unwrap());
        // the sharp corner point is removed
        assert!(filleted.distance(DVec3::new(0.99, 0.0, 0.99)) > 0.0);
        // the face centre is untouched
        assert!(filleted.distance(DVec3::new(0.0, 0.0, 0.99)) < 0.0);
        // below the band the wall is unchanged
        assert!(filleted.distance(DVec3::new(0.99, 0.0, 0.7)) < 0.0);
    }

    #[test]
    fn test_lateral_fillet_keeps_point_counts() {
        let loft = prism(2.0, 1.0).fillet_lateral(0.2).unwrap();
        let counts: Vec<usize> = loft.sections.iter().map(|s| s.polygon.len()).collect();
        assert_eq!(counts, vec![4 * (CORNER_SEGMENTS + 1); 2]);
        let shape = Shape::loft(loft);
        assert!(shape.distance(DVec3::new(0.99, 0.99, 0.5)) > 0.0);
    }

    #[test]
    fn test_oversized_fillet_rejected() {
        assert!(prism(2.0, 1.0).fillet_lateral(1.5).is_err());
        assert!(prism(2.0, 1.0).treat_end(true, EdgeTreatment::Fillet(1.0)).is_err());
    }

    #[test]
    fn test_stepped_loft() {
        let loft = Loft::new(
            SketchPlane::xy(),
            vec![
                Section {
                    polygon: square(4.0),
                    offset: 0.0,
                },
                Section {
                    polygon: square(4.0),
                    offset: 1.0,
                },
                Section {
                    polygon: square(2.0),
                    offset: 1.0,
                },
                Section {
                    polygon: square(2.0),
                    offset: 2.0,
                },
            ],
        );
        let shape = Shape::loft(loft);
        assert!(shape.distance(DVec3::new(1.5, 0.0, 0.5)) < 0.0);
        assert!(shape.distance(DVec3::new(1.5, 0.0, 1.5)) > 0.0);
        assert!(shape.distance(DVec3::new(0.5, 0.0, 1.5)) < 0.0);
    }

    #[test]
    fn test_partial_revolution_wedge() {
        let rev = Revolution {
            origin: DVec3::ZERO,
            axis: DVec3::Z,
            radial: DVec3::X,
            profile: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(1.0, 1.0),
                DVec2::new(0.0, 1.0),
            ],
            angle: FRAC_PI_2,
        };
        let shape = Shape::revolution(rev);
        assert!(shape.distance(DVec3::new(0.5, 0.5, 0.5)) < 0.0);
        assert!(shape.distance(DVec3::new(-0.5, 0.5, 0.5)) > 0.0);
        assert!(shape.distance(DVec3::new(0.5, -0.5, 0.5)) > 0.0);
        assert_relative_eq!(shape.bounds.min.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(shape.bounds.max.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_folding() {
        let base = Arc::new(Shape::loft(prism(2.0, 1.0)));
        let once = Arc::new(Shape::transformed(base, DAffine3::from_translation(DVec3::X)));
        let twice = Shape::transformed(once, DAffine3::from_translation(DVec3::X));
        match &twice.kind {
            ShapeKind::Transformed { shape, .. } => {
                assert!(matches!(shape.kind, ShapeKind::Loft(_)))
            }
            other => panic!("expected transform, got {other:?}"),
        }
        assert!(twice.distance(DVec3::new(2.0, 0.0, 0.5)) < 0.0);
        assert!(twice.distance(DVec3::new(0.5, 0.0, 0.5)) > 0.0);
    }

    #[test]
    fn test_rotated_revolution_keeps_tight_bounds() {
        let rev = Revolution {
            origin: DVec3::ZERO,
            axis: DVec3::Z,
            radial: DVec3::X,
            profile: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(1.0, 1.0),
                DVec2::new(0.0, 1.0),
            ],
            angle: FRAC_PI_2,
        };
        let quarter = Arc::new(Shape::revolution(rev));
        let turned = Shape::transformed(
            quarter,
            DAffine3::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_4),
        );
        assert!(matches!(turned.kind, ShapeKind::Revolution(_)));
        assert_relative_eq!(turned.bounds.max.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(turned.bounds.min.x, -(0.5_f64.sqrt()), epsilon = 1e-12);
        assert!(turned.distance(DVec3::new(0.0, 0.5, 0.5)) < 0.0);

        let sphere = Arc::new(Shape::sphere(DVec3::ZERO, 1.0));
        let moved = Shape::transformed(sphere, DAffine3::from_translation(DVec3::X));
        assert_relative_eq!(moved.distance(DVec3::new(2.0, 0.0, 0.0)), 0.0);
    }
}
