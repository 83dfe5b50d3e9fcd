//! Sketch placement and profile construction
//!
//! A sketch is a value: a [`Wire2D`](crate::Wire2D) plus the [`SketchPlane`]
//! that places it in space. Nothing here holds a hidden cursor between
//! operations.

pub(crate) mod path;

pub use path::PathBuilder;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// A plane in 3D space that sketch coordinates are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchPlane {
    /// Origin of the plane in world coordinates
    pub origin: DVec3,
    /// Local X axis direction
    pub x_axis: DVec3,
    /// Local Y axis direction
    pub y_axis: DVec3,
    /// Plane normal (`x_axis × y_axis`)
    pub normal: DVec3,
}

impl SketchPlane {
    /// Create a plane from an origin and two in-plane axes
    pub fn new(origin: DVec3, x_axis: DVec3, y_axis: DVec3) -> Self {
        let x_axis = x_axis.normalize();
        let y_axis = y_axis.normalize();
        Self {
            origin,
            x_axis,
            y_axis,
            normal: x_axis.cross(y_axis),
        }
    }

    /// XY plane, normal +Z
    pub fn xy() -> Self {
        Self::new(DVec3::ZERO, DVec3::X, DVec3::Y)
    }

    /// XZ plane: local x is world X, local y is world Z, normal -Y
    pub fn xz() -> Self {
        Self::new(DVec3::ZERO, DVec3::X, DVec3::Z)
    }

    /// YZ plane: local x is world Y, local y is world Z, normal +X
    pub fn yz() -> Self {
        Self::new(DVec3::ZERO, DVec3::Y, DVec3::Z)
    }

    /// Same orientation with a different origin
    pub fn at(self, origin: DVec3) -> Self {
        Self { origin, ..self }
    }

    /// Same plane shifted along its normal
    pub fn offset(self, distance: f64) -> Self {
        Self {
            origin: self.origin + self.normal * distance,
            ..self
        }
    }

    /// Convert a sketch point to world coordinates
    pub fn to_world(&self, p: DVec2) -> DVec3 {
        self.origin + self.x_axis * p.x + self.y_axis * p.y
    }

    /// Convert a world point to `(x, y, height above plane)`
    pub fn to_local(&self, p: DVec3) -> DVec3 {
        let d = p - self.origin;
        DVec3::new(d.dot(self.x_axis), d.dot(self.y_axis), d.dot(self.normal))
    }

    /// Whether two planes share orientation (origins may differ)
    pub fn is_parallel_to(&self, other: &SketchPlane) -> bool {
        const EPS: f64 = 1e-9;
        self.x_axis.abs_diff_eq(other.x_axis, EPS) && self.y_axis.abs_diff_eq(other.y_axis, EPS)
    }
}

impl Default for SketchPlane {
    fn default() -> Self {
        Self::xy()
    }
}
