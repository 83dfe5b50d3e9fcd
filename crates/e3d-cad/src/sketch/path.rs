//! Path builder for closed profiles made of lines and arcs

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::DVec2;

use crate::kernel::{CadError, CadResult, Wire2D};

/// Polyline segments used for a quarter turn of arc
pub const ARC_SEGMENTS_PER_QUARTER: usize = 8;

/// Polyline segments used for a rounded corner
pub const CORNER_SEGMENTS: usize = 8;

/// Builds a closed [`Wire2D`] from line and arc segments.
///
/// Arcs are flattened as they are added. Corners marked with
/// [`round`](Self::round) are filleted when the path is closed.
///
/// ```
/// use e3d_cad::PathBuilder;
/// use glam::DVec2;
///
/// let wire = PathBuilder::move_to(DVec2::ZERO)
///     .line(2.0, 0.0)
///     .round(0.5)
///     .line(0.0, 1.0)
///     .line_to(DVec2::new(0.0, 1.0))
///     .close()
///     .unwrap();
/// assert!(wire.closed);
/// ```
#[derive(Debug, Clone)]
pub struct PathBuilder {
    points: Vec<DVec2>,
    radii: Vec<Option<f64>>,
}

impl PathBuilder {
    /// Start a new path at `start`
    pub fn move_to(start: DVec2) -> Self {
        Self {
            points: vec![start],
            radii: vec![None],
        }
    }

    fn current(&self) -> DVec2 {
        // a builder always holds its start point
        self.points.last().copied().unwrap_or(DVec2::ZERO)
    }

    fn push(&mut self, p: DVec2) {
        if self.current().distance_squared(p) > 1e-20 {
            self.points.push(p);
            self.radii.push(None);
        }
    }

    /// Line relative to the current point
    pub fn line(self, dx: f64, dy: f64) -> Self {
        let end = self.current() + DVec2::new(dx, dy);
        self.line_to(end)
    }

    /// Line to an absolute point
    pub fn line_to(mut self, end: DVec2) -> Self {
        self.push(end);
        self
    }

    /// Circular arc from the current point through `mid` to `end`.
    ///
    /// Collinear points degrade to a straight line.
    pub fn three_point_arc(mut self, mid: DVec2, end: DVec2) -> Self {
        let start = self.current();
        let Some(center) = circumcenter(start, mid, end) else {
            self.push(end);
            return self;
        };

        let a0 = angle_of(start - center);
        let am = angle_of(mid - center);
        let a1 = angle_of(end - center);
        let ccw_to_mid = (am - a0).rem_euclid(TAU);
        let ccw_to_end = (a1 - a0).rem_euclid(TAU);
        let sweep = if ccw_to_mid <= ccw_to_end {
            ccw_to_end
        } else {
            ccw_to_end - TAU
        };
        self.push_arc(center, a0, sweep, end);
        self
    }

    /// Circular arc around `center` from the current point to `end`
    pub fn arc_around(mut self, center: DVec2, end: DVec2, ccw: bool) -> Self {
        let a0 = angle_of(self.current() - center);
        let a1 = angle_of(end - center);
        let sweep = if ccw {
            (a1 - a0).rem_euclid(TAU)
        } else {
            -(a0 - a1).rem_euclid(TAU)
        };
        self.push_arc(center, a0, sweep, end);
        self
    }

    fn push_arc(&mut self, center: DVec2, a0: f64, sweep: f64, end: DVec2) {
        let radius = (end - center).length();
        let steps = ((sweep.abs() / FRAC_PI_2) * ARC_SEGMENTS_PER_QUARTER as f64)
            .ceil()
            .max(1.0) as usize;
        for i in 1..steps {
            let a = a0 + sweep * i as f64 / steps as f64;
            self.push(center + DVec2::new(a.cos(), a.sin()) * radius);
        }
        self.push(end);
    }

    /// Mark the current corner to be rounded with `radius`
    pub fn round(mut self, radius: f64) -> Self {
        if let Some(r) = self.radii.last_mut() {
            *r = Some(radius);
        }
        self
    }

    /// Finish the path, closing it back to the start point
    pub fn close(mut self) -> CadResult<Wire2D> {
        if self.points.len() > 1 && self.points[0].distance_squared(self.current()) <= 1e-20 {
            // the closing point coincides with the start; keep the start's marker
            let last = self.radii.pop().flatten();
            self.points.pop();
            if self.radii[0].is_none() {
                self.radii[0] = last;
            }
        }
        if self.points.len() < 3 {
            return Err(CadError::InvalidProfile(format!(
                "Closed path needs at least 3 points, got {}",
                self.points.len()
            )));
        }
        let points = round_marked(&self.points, &self.radii)?;
        Ok(Wire2D::new(points, true))
    }
}

fn angle_of(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}

fn circumcenter(a: DVec2, b: DVec2, c: DVec2) -> Option<DVec2> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-15 {
        return None;
    }
    let (a2, b2, c2) = (a.length_squared(), b.length_squared(), c.length_squared());
    Some(DVec2::new(
        (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
        (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
    ))
}

/// Length along each adjacent edge that a fillet of `radius` consumes at `cur`.
///
/// Zero for straight-through or degenerate corners.
pub(crate) fn tangent_length(prev: DVec2, cur: DVec2, next: DVec2, radius: f64) -> f64 {
    let (Some(d1), Some(d2)) = (
        (prev - cur).try_normalize(),
        (next - cur).try_normalize(),
    ) else {
        return 0.0;
    };
    let half = d1.dot(d2).clamp(-1.0, 1.0).acos() / 2.0;
    if half >= FRAC_PI_2 - 1e-9 || half <= 1e-9 {
        return 0.0;
    }
    radius / half.tan()
}

/// Replace the corner at `cur` by an arc of `segments + 1` points.
///
/// Straight or degenerate corners yield `cur` repeated so that point counts
/// stay stable across lofted sections.
pub(crate) fn round_corner(
    prev: DVec2,
    cur: DVec2,
    next: DVec2,
    radius: f64,
    segments: usize,
) -> Vec<DVec2> {
    let t = tangent_length(prev, cur, next, radius);
    let (Some(d1), Some(d2)) = (
        (prev - cur).try_normalize(),
        (next - cur).try_normalize(),
    ) else {
        return vec![cur; segments + 1];
    };
    let Some(bisector) = (d1 + d2).try_normalize() else {
        return vec![cur; segments + 1];
    };
    if t <= 0.0 {
        return vec![cur; segments + 1];
    }

    let t1 = cur + d1 * t;
    let t2 = cur + d2 * t;
    let center = cur + bisector * (t * t + radius * radius).sqrt();
    let a0 = angle_of(t1 - center);
    let a1 = angle_of(t2 - center);
    let mut sweep = (a1 - a0).rem_euclid(TAU);
    if sweep > std::f64::consts::PI {
        sweep -= TAU;
    }
    (0..=segments)
        .map(|i| {
            let a = a0 + sweep * i as f64 / segments as f64;
            center + DVec2::new(a.cos(), a.sin()) * radius
        })
        .collect()
}

/// Round every corner of a closed loop that carries a radius.
///
/// Fails when two fillets on one edge need more than the edge length.
pub(crate) fn round_marked(points: &[DVec2], radii: &[Option<f64>]) -> CadResult<Vec<DVec2>> {
    let n = points.len();
    let corner = |i: usize| (points[(i + n - 1) % n], points[i], points[(i + 1) % n]);

    let tangents: Vec<f64> = (0..n)
        .map(|i| {
            radii[i].map_or(Ok(0.0), |r| {
                if r <= 0.0 {
                    return Err(CadError::InvalidProfile(format!(
                        "Fillet radius must be positive, got {r}"
                    )));
                }
                let (p, c, q) = corner(i);
                Ok(tangent_length(p, c, q, r))
            })
        })
        .collect::<CadResult<_>>()?;

    for i in 0..n {
        let j = (i + 1) % n;
        let edge = points[i].distance(points[j]);
        if tangents[i] + tangents[j] > edge + 1e-9 {
            return Err(CadError::InvalidProfile(format!(
                "Fillet too large for edge of length {edge:.4} at point {i}"
            )));
        }
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        match radii[i] {
            Some(r) if tangents[i] > 0.0 => {
                let (p, c, q) = corner(i);
                out.extend(round_corner(p, c, q, r, CORNER_SEGMENTS));
            }
            _ => out.push(points[i]),
        }
    }
    Ok(out)
}
