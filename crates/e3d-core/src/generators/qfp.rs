//! Quad flat package with gull-wing leads (QFP)
//!
//! The body follows the DIP construction (drafted halves around a straight
//! lead band) but with chamfered corners, the pin-1 corner cut deeper than
//! the others. The pin-1 mark is a shallow spherical dimple.

use std::f64::consts::SQRT_2;

use e3d_cad::{BooleanType, CadKernel, EdgeSelector, PathBuilder, SketchPlane, Solid, Wire2D};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{BODY_DRAFT_DEG, CASE_COLOR, PIN_COLOR};
use crate::generator::{GenerateError, Generator, require, require_positive};
use crate::generators::quad_pins;
use crate::model::ComponentModel;

/// Shrink of the upper half relative to the band
pub const TOP_INSET: f64 = 0.15;
/// Lead metal thickness
pub const LEAD_THICKNESS: f64 = 0.1;
/// Inner radius of the upper bend
pub const UPPER_BEND_RADIUS: f64 = 0.1;
/// Inner radius of the lower bend
pub const LOWER_BEND_RADIUS: f64 = 0.1;
/// Straight run from the body wall to the upper bend
pub const SHOULDER: f64 = 0.2;
/// Pin-1 dimple size; its cap through the top face has radius `FIRST_PIN_RADIUS / √2`
pub const FIRST_PIN_RADIUS: f64 = 0.5;
/// Gap between the chamfered corner and the dimple
pub const FIRST_PIN_OFFSET: f64 = 0.2;
/// Depth of the pin-1 dimple
pub const FIRST_PIN_DEPTH: f64 = 0.1;
pub const EDGE_FILLET: f64 = 0.05;
/// Largest pin-1 corner chamfer
pub const MAX_CORNER_CHAMFER: f64 = 1.0;

/// QFP dimensions in millimetres (JEDEC naming)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QfpParams {
    /// Lead tip to lead tip along X
    pub d: f64,
    /// Lead tip to lead tip along Y
    pub e: f64,
    /// Body length
    pub d1: f64,
    /// Body width
    pub e1: f64,
    /// Board separation
    pub a1: f64,
    /// Body height
    pub a2: f64,
    /// Lead width
    pub b: f64,
    pub pitch: f64,
    /// Pins on each edge parallel to X
    pub npx: usize,
    /// Pins on each edge parallel to Y
    pub npy: usize,
    /// Exposed pad `(D2, E2)`
    pub epad: Option<(f64, f64)>,
}

impl QfpParams {
    /// JEDEC MS-026 style package: square, 0.1 standoff, 1.0 body
    pub fn jedec(size: f64, body: f64, b: f64, pitch: f64, npx: usize) -> Self {
        Self {
            d: size,
            e: size,
            d1: body,
            e1: body,
            a1: 0.1,
            a2: 1.0,
            b,
            pitch,
            npx,
            npy: npx,
            epad: None,
        }
    }

    pub fn height(&self) -> f64 {
        self.a1 + self.a2
    }

    /// Horizontal reach of a lead beyond the body wall (along Y, along X)
    fn lead_spans(&self) -> (f64, f64) {
        ((self.e - self.e1) / 2.0, (self.d - self.d1) / 2.0)
    }

    fn validate(&self) -> Result<(), GenerateError> {
        require_positive(&[
            ("D", self.d),
            ("E", self.e),
            ("D1", self.d1),
            ("E1", self.e1),
            ("A1", self.a1),
            ("A2", self.a2),
            ("b", self.b),
            ("pitch", self.pitch),
        ])?;
        require(self.npx > 0 && self.npy > 0, || {
            format!("need pins on every side, got {}x{}", self.npx, self.npy)
        })?;
        require(self.a2 > LEAD_THICKNESS + 2.0 * EDGE_FILLET, || {
            format!("body height A2 ({}) too small", self.a2)
        })?;
        require(self.b < self.pitch, || {
            format!("lead width {} does not fit pitch {}", self.b, self.pitch)
        })?;
        let min_span = SHOULDER + UPPER_BEND_RADIUS + LOWER_BEND_RADIUS + 2.0 * LEAD_THICKNESS;
        let (span_y, span_x) = self.lead_spans();
        require(span_x > min_span && span_y > min_span, || {
            format!(
                "lead span {span_x}x{span_y} too short for a gull-wing lead (needs > {min_span})"
            )
        })?;
        let row_x = (self.npx - 1) as f64 * self.pitch + self.b;
        let row_y = (self.npy - 1) as f64 * self.pitch + self.b;
        require(row_x < self.d1 && row_y < self.e1, || {
            format!(
                "{}x{} leads at pitch {} do not fit a {}x{} body",
                self.npx, self.npy, self.pitch, self.d1, self.e1
            )
        })?;
        if let Some((d2, e2)) = self.epad {
            require_positive(&[("D2", d2), ("E2", e2)])?;
            require(d2 < self.d1 && e2 < self.e1, || {
                format!("exposed pad {d2}x{e2} larger than the body")
            })?;
        }
        Ok(())
    }
}

/// Generator for [`QfpParams`]
#[derive(Debug, Clone)]
pub struct QfpGenerator {
    params: QfpParams,
}

/// Corner chamfers of one body section: pin-1 corner and the others
fn section(width: f64, height: f64, full_width: f64, cc1: f64, cc: f64) -> Wire2D {
    let shrink = (full_width - width) / 4.0;
    Wire2D::chamfered_rect(width, height, (cc1 - shrink).max(0.0), (cc - shrink).max(0.0))
}

impl QfpGenerator {
    pub fn new(params: QfpParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &QfpParams {
        &self.params
    }

    /// Pin-1 corner chamfer, sized from the free margin around the lead rows
    fn corner_chamfer(&self) -> f64 {
        let p = &self.params;
        let row_x = (p.npx - 1) as f64 * p.pitch + p.b;
        let row_y = (p.npy - 1) as f64 * p.pitch + p.b;
        let margin = ((p.d1 - row_x) / 2.0).min((p.e1 - row_y) / 2.0);
        (margin - 0.5 * TOP_INSET).clamp(0.0, MAX_CORNER_CHAMFER)
    }

    fn case(&self, kernel: &dyn CadKernel) -> Result<Solid, GenerateError> {
        let p = &self.params;
        let tan = BODY_DRAFT_DEG.to_radians().tan();
        let half = (p.a2 - LEAD_THICKNESS) / 2.0;
        let band = p.a1 + half;
        let draft = 2.0 * tan * half;
        let cc1 = self.corner_chamfer();
        let cc = cc1 / 2.0;

        let (d1_b, e1_b) = (p.d1 - draft, p.e1 - draft);
        let (d1_t1, e1_t1) = (p.d1 - TOP_INSET, p.e1 - TOP_INSET);
        let (d1_t2, e1_t2) = (d1_t1 - draft, e1_t1 - draft);
        let cc1_top = (cc1 - (p.d1 - d1_t2) / 4.0).max(0.0);
        let at = |z: f64| SketchPlane::xy().at(DVec3::new(0.0, 0.0, z));
        debug!(cc1, cc, "QFP corner chamfers");

        let case = kernel.loft(
            &[
                (section(d1_b, e1_b, p.d1, cc1, cc), at(p.a1)),
                (section(p.d1, p.e1, p.d1, cc1, cc), at(band)),
                (section(p.d1, p.e1, p.d1, cc1, cc), at(band + LEAD_THICKNESS)),
                (section(d1_t1, e1_t1, p.d1, cc1, cc), at(band + LEAD_THICKNESS)),
                (section(d1_t2, e1_t2, p.d1, cc1, cc), at(p.height())),
            ],
            true,
        )?;
        let case = kernel.fillet(&case, EdgeSelector::Top, EDGE_FILLET)?;

        // sphere cutting a cap of depth FIRST_PIN_DEPTH out of the top face
        let (r, z) = (FIRST_PIN_RADIUS, FIRST_PIN_DEPTH);
        let radius = (r * r / 2.0 + z * z) / (2.0 * z);
        let offset = cc1_top / 2.0 + (FIRST_PIN_OFFSET + r) / SQRT_2;
        let dimple = kernel.create_sphere(
            DVec3::new(
                -d1_t2 / 2.0 + offset,
                -e1_t2 / 2.0 + offset,
                p.height() + radius - z,
            ),
            radius,
        )?;
        Ok(kernel.boolean(&case, &dimple, BooleanType::Subtract)?)
    }

    /// Gull-wing lead leaving the +Y wall at `wall`, toe `span` further out
    fn pin(&self, kernel: &dyn CadKernel, wall: f64, span: f64) -> Result<Solid, GenerateError> {
        let p = &self.params;
        let c = LEAD_THICKNESS;
        let (r1, r2) = (UPPER_BEND_RADIUS, LOWER_BEND_RADIUS);
        let (r1_out, r2_out) = (r1 + c, r2 + c);
        let s = SHOULDER;
        let zb = p.a1 + (p.a2 - c) / 2.0;
        let k = 1.0 - 1.0 / SQRT_2;
        let toe = span;
        let pt = DVec2::new;

        let outline = PathBuilder::move_to(pt(-TOP_INSET, zb))
            .line_to(pt(s, zb))
            .three_point_arc(pt(s + r1 / SQRT_2, zb - r1 * k), pt(s + r1, zb - r1))
            .line_to(pt(s + r1, r2_out))
            .three_point_arc(pt(s + r1 + r2_out * k, r2_out * k), pt(s + r1 + r2_out, 0.0))
            .line_to(pt(toe, 0.0))
            .line_to(pt(toe, c))
            .line_to(pt(s + r1 + r2_out, c))
            .three_point_arc(
                pt(s + r1 + r2_out - r2 / SQRT_2, c + r2 * k),
                pt(s + r1 + c, c + r2),
            )
            .line_to(pt(s + r1 + c, zb - r1))
            .three_point_arc(pt(s + r1_out / SQRT_2, zb + c - r1_out * k), pt(s, zb + c))
            .line_to(pt(-TOP_INSET, zb + c))
            .close()?;

        let plane = SketchPlane::yz().at(DVec3::new(-p.b / 2.0, wall, 0.0));
        Ok(kernel.extrude(&outline, &plane, p.b)?)
    }
}

impl Generator for QfpGenerator {
    fn family(&self) -> &'static str {
        "qfp"
    }

    fn pin_count(&self) -> usize {
        2 * (self.params.npx + self.params.npy)
    }

    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError> {
        let p = &self.params;
        p.validate()?;
        debug!(d = p.d, d1 = p.d1, npx = p.npx, npy = p.npy, "Generating QFP");

        let case = self.case(kernel)?;
        debug!("QFP case built");

        let (span_y, span_x) = p.lead_spans();
        let top_pin = self.pin(kernel, p.e1 / 2.0, span_y)?;
        let side_pin = self.pin(kernel, p.d1 / 2.0, span_x)?;
        let mut pins = quad_pins(kernel, &top_pin, &side_pin, p.pitch, p.npx, p.npy)?;
        if let Some((d2, e2)) = p.epad {
            let pad = kernel.create_box(DVec3::new(0.0, 0.0, p.a1 / 2.0), DVec3::new(d2, e2, p.a1))?;
            pins = kernel.boolean(&pins, &pad, BooleanType::Union)?;
        }
        debug!(count = self.pin_count(), "QFP pins built");

        let case = kernel.boolean(&case, &pins, BooleanType::Subtract)?;

        let mut model = ComponentModel::new();
        model.add_part(case, CASE_COLOR, "body");
        model.add_part(pins, PIN_COLOR, "pins");
        Ok(model)
    }
}
