//! Quad flat no-lead package (QFN), plain or with a molded flange

use e3d_cad::{BooleanType, CadKernel, EdgeSelector, PathBuilder, SketchPlane, Solid, Wire2D};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{BODY_DRAFT_DEG, CASE_COLOR, PIN_COLOR};
use crate::generator::{GenerateError, Generator, require, require_positive};
use crate::generators::quad_pins;
use crate::model::ComponentModel;

/// Pin thickness
pub const PIN_THICKNESS: f64 = 0.2;
/// Pin length from the package edge inwards
pub const PIN_LENGTH: f64 = 0.35;
pub const EDGE_FILLET: f64 = 0.03;
pub const FIRST_PIN_RADIUS: f64 = 0.2;
pub const FIRST_PIN_DEPTH: f64 = 0.05;
pub const FIRST_PIN_OFFSET: f64 = 0.2;
/// Pin-1 corner cut of the exposed pad
pub const PAD_CHAMFER: f64 = 0.2;

/// Case style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QfnCase {
    /// Straight-walled block
    Standard,
    /// Thin flange at pin height carrying a drafted, chamfered body
    Molded {
        d1: f64,
        e1: f64,
        /// Draft angle of the body walls, degrees
        draft: f64,
        /// Corner chamfer of the flange
        chamfer: f64,
    },
}

/// QFN dimensions in millimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QfnParams {
    /// Package length along X
    pub d: f64,
    /// Package width along Y
    pub e: f64,
    /// Overall height
    pub a: f64,
    /// Board separation
    pub a1: f64,
    /// Pin width
    pub b: f64,
    pub pitch: f64,
    /// Pins on each edge parallel to X
    pub npx: usize,
    /// Pins on each edge parallel to Y
    pub npy: usize,
    /// Exposed pad `(D2, E2)`
    pub epad: Option<(f64, f64)>,
    pub case: QfnCase,
}

impl QfnParams {
    fn case_size(&self) -> (f64, f64) {
        (self.d - 2.0 * self.a1, self.e - 2.0 * self.a1)
    }

    fn validate(&self) -> Result<(), GenerateError> {
        require_positive(&[
            ("D", self.d),
            ("E", self.e),
            ("A", self.a),
            ("A1", self.a1),
            ("b", self.b),
            ("pitch", self.pitch),
        ])?;
        require(self.npx > 0 && self.npy > 0, || {
            format!("need pins on every side, got {}x{}", self.npx, self.npy)
        })?;
        require(self.a > PIN_THICKNESS + 2.0 * EDGE_FILLET, || {
            format!("height A ({}) too small for pins of {PIN_THICKNESS}", self.a)
        })?;
        require(self.b < self.pitch && self.b < 2.0 * PIN_LENGTH, || {
            format!("pin width {} does not fit pitch {}", self.b, self.pitch)
        })?;
        let row_x = (self.npx - 1) as f64 * self.pitch + self.b;
        let row_y = (self.npy - 1) as f64 * self.pitch + self.b;
        require(row_x < self.d - 2.0 * PIN_LENGTH && row_y < self.e - 2.0 * PIN_LENGTH, || {
            format!(
                "{}x{} pins at pitch {} collide in the corners of a {}x{} package",
                self.npx, self.npy, self.pitch, self.d, self.e
            )
        })?;
        if let Some((d2, e2)) = self.epad {
            require_positive(&[("D2", d2), ("E2", e2)])?;
            require(d2 < self.d - 2.0 * PIN_LENGTH && e2 < self.e - 2.0 * PIN_LENGTH, || {
                format!("exposed pad {d2}x{e2} overlaps the pins")
            })?;
            require(d2 > PAD_CHAMFER && e2 > PAD_CHAMFER, || {
                format!("exposed pad {d2}x{e2} smaller than its corner cut")
            })?;
        }
        if let QfnCase::Molded {
            d1,
            e1,
            draft,
            chamfer,
        } = self.case
        {
            require_positive(&[("D1", d1), ("E1", e1), ("chamfer", chamfer)])?;
            let (cw, cl) = self.case_size();
            require(d1 <= cw && e1 <= cl, || {
                format!("molded body {d1}x{e1} wider than the flange {cw}x{cl}")
            })?;
            require((0.0..45.0).contains(&draft), || {
                format!("draft angle {draft} out of range")
            })?;
            require(2.0 * chamfer < d1.min(e1), || {
                format!("flange chamfer {chamfer} too large")
            })?;
        }
        Ok(())
    }
}

/// Generator for [`QfnParams`]
#[derive(Debug, Clone)]
pub struct QfnGenerator {
    params: QfnParams,
}

impl QfnGenerator {
    pub fn new(params: QfnParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &QfnParams {
        &self.params
    }

    fn standard_case(&self, kernel: &dyn CadKernel) -> Result<(Solid, DVec2), GenerateError> {
        let p = &self.params;
        let (cw, cl) = p.case_size();
        let plane = SketchPlane::xy().at(DVec3::new(0.0, 0.0, p.a1));
        let case = kernel.extrude(&Wire2D::rectangle(DVec2::ZERO, cw, cl), &plane, p.a - p.a1)?;
        let case = kernel.fillet(&case, EdgeSelector::Lateral, EDGE_FILLET)?;
        let case = kernel.fillet(&case, EdgeSelector::Top, EDGE_FILLET)?;
        Ok((case, DVec2::new(cw, cl)))
    }

    fn molded_case(
        &self,
        kernel: &dyn CadKernel,
        d1: f64,
        e1: f64,
        draft: f64,
        chamfer: f64,
    ) -> Result<(Solid, DVec2), GenerateError> {
        let p = &self.params;
        let (cw, cl) = p.case_size();
        let shrink = 2.0 * draft.to_radians().tan() * (p.a - PIN_THICKNESS);
        let (d1_top, e1_top) = (d1 - shrink, e1 - shrink);
        let at = |z: f64| SketchPlane::xy().at(DVec3::new(0.0, 0.0, z));

        let flange = Wire2D::chamfered_rect(cw, cl, chamfer, chamfer);
        let case = kernel.loft(
            &[
                (flange.clone(), at(p.a1)),
                (flange, at(PIN_THICKNESS)),
                (
                    Wire2D::chamfered_rect(d1, e1, 0.8 * chamfer, 0.8 * chamfer),
                    at(PIN_THICKNESS),
                ),
                (
                    Wire2D::chamfered_rect(d1_top, e1_top, 0.6 * chamfer, 0.6 * chamfer),
                    at(p.a),
                ),
            ],
            true,
        )?;
        let case = kernel.fillet(&case, EdgeSelector::Lateral, EDGE_FILLET)?;
        let case = kernel.fillet(&case, EdgeSelector::Top, EDGE_FILLET)?;
        Ok((case, DVec2::new(d1_top, e1_top)))
    }

    /// Flat pin on the +Y edge, round end facing the package centre
    fn pin(&self, kernel: &dyn CadKernel, half_span: f64) -> Result<Solid, GenerateError> {
        let b = self.params.b;
        let inner = half_span - PIN_LENGTH;
        let outline = PathBuilder::move_to(DVec2::new(b / 2.0, half_span))
            .line_to(DVec2::new(-b / 2.0, half_span))
            .line_to(DVec2::new(-b / 2.0, inner + b / 2.0))
            .three_point_arc(DVec2::new(0.0, inner), DVec2::new(b / 2.0, inner + b / 2.0))
            .close()?;
        Ok(kernel.extrude(&outline, &SketchPlane::xy(), PIN_THICKNESS)?)
    }

    fn exposed_pad(&self, kernel: &dyn CadKernel, d2: f64, e2: f64) -> Result<Solid, GenerateError> {
        let (hx, hy) = (d2 / 2.0, e2 / 2.0);
        let outline = Wire2D::new(
            vec![
                DVec2::new(-hx + PAD_CHAMFER, -hy),
                DVec2::new(hx, -hy),
                DVec2::new(hx, hy),
                DVec2::new(-hx, hy),
                DVec2::new(-hx, -hy + PAD_CHAMFER),
            ],
            true,
        );
        Ok(kernel.extrude(&outline, &SketchPlane::xy(), self.params.a1)?)
    }
}

impl Generator for QfnGenerator {
    fn family(&self) -> &'static str {
        "qfn"
    }

    fn pin_count(&self) -> usize {
        2 * (self.params.npx + self.params.npy)
    }

    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError> {
        let p = &self.params;
        p.validate()?;
        debug!(d = p.d, e = p.e, npx = p.npx, npy = p.npy, case = ?p.case, "Generating QFN");

        let (case, top) = match p.case {
            QfnCase::Standard => self.standard_case(kernel)?,
            QfnCase::Molded {
                d1,
                e1,
                draft,
                chamfer,
            } => self.molded_case(kernel, d1, e1, draft, chamfer)?,
        };
        let inset = FIRST_PIN_OFFSET + FIRST_PIN_RADIUS;
        let marker = kernel.create_cylinder(
            DVec3::new(-top.x / 2.0 + inset, -top.y / 2.0 + inset, p.a - FIRST_PIN_DEPTH),
            FIRST_PIN_RADIUS,
            2.0 * FIRST_PIN_DEPTH,
            DVec3::Z,
        )?;
        let case = kernel.boolean(&case, &marker, BooleanType::Subtract)?;
        debug!("QFN case built");

        let top_pin = self.pin(kernel, p.e / 2.0)?;
        let side_pin = self.pin(kernel, p.d / 2.0)?;
        let mut pins = quad_pins(kernel, &top_pin, &side_pin, p.pitch, p.npx, p.npy)?;
        if let Some((d2, e2)) = p.epad {
            let pad = self.exposed_pad(kernel, d2, e2)?;
            pins = kernel.boolean(&pins, &pad, BooleanType::Union)?;
        }
        debug!(count = self.pin_count(), pad = p.epad.is_some(), "QFN pins built");

        let case = kernel.boolean(&case, &pins, BooleanType::Subtract)?;

        let mut model = ComponentModel::new();
        model.add_part(case, CASE_COLOR, "body");
        model.add_part(pins, PIN_COLOR, "pins");
        Ok(model)
    }
}
