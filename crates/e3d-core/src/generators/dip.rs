//! Dual in-line package (DIP)
//!
//! The case is a ruled loft through five rectangular sections: a drafted
//! lower half, a straight band where the leads leave the body, and a drafted
//! upper half stepped in by [`TOP_INSET`]. Pins are sketched in the XZ plane,
//! swept across to the body centre, and trimmed by the bent-lead L profile.

use e3d_cad::{
    Axis3D, BooleanType, CadKernel, EdgeSelector, PathBuilder, SketchPlane, Solid, Wire2D,
};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{BODY_DRAFT_DEG, CASE_COLOR, PIN_COLOR, mm};
use crate::generator::{GenerateError, Generator, require, require_positive};
use crate::model::ComponentModel;

/// Lead length below the seating plane
pub const LEAD_LENGTH: f64 = 3.3;
/// Lead metal thickness
pub const LEAD_THICKNESS: f64 = 0.254;
/// Body edge fillet
pub const EDGE_FILLET: f64 = 0.05;
/// Shrink of the upper half relative to the band
pub const TOP_INSET: f64 = 0.15;
pub const FIRST_PIN_RADIUS: f64 = 0.8;
pub const FIRST_PIN_DEPTH: f64 = 0.2;
pub const FIRST_PIN_OFFSET: f64 = 0.4;
pub const NOTCH_RADIUS: f64 = 0.75;
pub const NOTCH_DEPTH: f64 = 0.5;

/// DIP dimensions in millimetres (JEDEC naming)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DipParams {
    /// Body length
    pub d: f64,
    /// Body width
    pub e1: f64,
    /// Lead span, shoulder to shoulder
    pub e: f64,
    /// Board separation
    pub a1: f64,
    /// Body height
    pub a2: f64,
    /// Upper (shoulder) lead width
    pub b1: f64,
    /// Lower lead width
    pub b: f64,
    pub pitch: f64,
    pub npins: usize,
}

impl DipParams {
    /// 300 mil row spacing
    pub fn dip300(length: f64, npins: usize) -> Self {
        Self {
            d: length,
            e1: 6.35,
            e: 7.874,
            a1: 0.38,
            a2: 3.3,
            b1: 1.524,
            b: 0.457,
            pitch: 2.54,
            npins,
        }
    }

    /// 600 mil row spacing
    pub fn dip600(length: f64, npins: usize) -> Self {
        Self {
            e1: mm(0.53),
            e: mm(0.61),
            ..Self::dip300(length, npins)
        }
    }

    /// Overall height above the board
    pub fn height(&self) -> f64 {
        self.a1 + self.a2
    }

    fn validate(&self) -> Result<(), GenerateError> {
        require_positive(&[
            ("D", self.d),
            ("E1", self.e1),
            ("E", self.e),
            ("A1", self.a1),
            ("A2", self.a2),
            ("b1", self.b1),
            ("b", self.b),
            ("pitch", self.pitch),
        ])?;
        require(self.npins >= 4 && self.npins % 2 == 0, || {
            format!("pin count must be even and at least 4, got {}", self.npins)
        })?;
        require(self.e > self.e1, || {
            format!("lead span E ({}) must exceed body width E1 ({})", self.e, self.e1)
        })?;
        require(self.b < self.b1, || {
            format!("lower lead width b ({}) must be below b1 ({})", self.b, self.b1)
        })?;
        require(self.a2 > 2.0 * LEAD_THICKNESS, || {
            format!("body height A2 ({}) too small for the lead band", self.a2)
        })?;
        let row = (self.npins / 2 - 1) as f64 * self.pitch + self.b;
        require(row < self.d, || {
            format!("{} pins at pitch {} do not fit a body of length {}", self.npins, self.pitch, self.d)
        })?;
        let marker = 2.0 * (FIRST_PIN_RADIUS + FIRST_PIN_OFFSET);
        require(self.d - TOP_INSET > marker && self.e1 - TOP_INSET > marker, || {
            format!("body {}x{} too small for the pin-1 marker", self.d, self.e1)
        })
    }
}

/// Generator for [`DipParams`]
#[derive(Debug, Clone)]
pub struct DipGenerator {
    params: DipParams,
}

impl DipGenerator {
    pub fn new(params: DipParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DipParams {
        &self.params
    }
}

/// Derived case dimensions
struct CaseSections {
    a2_half: f64,
    d_bottom: f64,
    e1_bottom: f64,
    d_top: f64,
    e1_top: f64,
}

impl CaseSections {
    fn new(p: &DipParams) -> Self {
        let tan = BODY_DRAFT_DEG.to_radians().tan();
        let a2_half = (p.a2 - LEAD_THICKNESS) / 2.0;
        let draft = 2.0 * tan * a2_half;
        Self {
            a2_half,
            d_bottom: p.d - draft,
            e1_bottom: p.e1 - draft,
            d_top: p.d - TOP_INSET - draft,
            e1_top: p.e1 - TOP_INSET - draft,
        }
    }
}

fn build_case(kernel: &dyn CadKernel, p: &DipParams, s: &CaseSections) -> Result<Solid, GenerateError> {
    let c = LEAD_THICKNESS;
    let band = p.a1 + s.a2_half;
    let at = |z: f64| SketchPlane::xy().at(DVec3::new(0.0, 0.0, z));
    let rect = |w: f64, h: f64| Wire2D::rectangle(DVec2::ZERO, w, h);

    let case = kernel.loft(
        &[
            (rect(s.d_bottom, s.e1_bottom), at(p.a1)),
            (rect(p.d, p.e1), at(band)),
            (rect(p.d, p.e1), at(band + c)),
            (rect(p.d - TOP_INSET, p.e1 - TOP_INSET), at(band + c)),
            (rect(s.d_top, s.e1_top), at(p.height())),
        ],
        true,
    )?;
    let case = kernel.fillet(&case, EdgeSelector::Lateral, EDGE_FILLET)?;
    let case = kernel.fillet(&case, EdgeSelector::Top, EDGE_FILLET)?;
    debug!("DIP case lofted");

    let top = p.height();
    let notch = kernel.create_cylinder(
        DVec3::new(s.d_bottom / 2.0, 0.0, top - NOTCH_DEPTH),
        NOTCH_RADIUS,
        2.0 * NOTCH_DEPTH,
        DVec3::Z,
    )?;
    let inset = FIRST_PIN_RADIUS + FIRST_PIN_OFFSET;
    let marker = kernel.create_cylinder(
        DVec3::new(s.d_top / 2.0 - inset, s.e1_top / 2.0 - inset, top - FIRST_PIN_DEPTH),
        FIRST_PIN_RADIUS,
        2.0 * FIRST_PIN_DEPTH,
        DVec3::Z,
    )?;
    let case = kernel.boolean(&case, &notch, BooleanType::Subtract)?;
    Ok(kernel.boolean(&case, &marker, BooleanType::Subtract)?)
}

/// XZ outline of an end pin: straight outer edge, shoulder on the inner side
fn end_pin_profile(p: &DipParams, shoulder_top: f64) -> Wire2D {
    let (b, b1, l) = (p.b, p.b1, LEAD_LENGTH);
    Wire2D::new(
        vec![
            DVec2::new(b / 2.0, shoulder_top),
            DVec2::new(b / 2.0, b - l),
            DVec2::new(b / 4.0, -l),
            DVec2::new(-b / 4.0, -l),
            DVec2::new(-b / 2.0, b - l),
            DVec2::new(-b / 2.0, 0.0),
            DVec2::new(-b1 / 2.0, 0.0),
            DVec2::new(-b1 / 2.0, shoulder_top),
        ],
        true,
    )
}

/// XZ outline of an interior pin, shouldered on both sides
fn inner_pin_profile(p: &DipParams, shoulder_top: f64) -> Wire2D {
    let (b, b1, l) = (p.b, p.b1, LEAD_LENGTH);
    Wire2D::new(
        vec![
            DVec2::new(b1 / 2.0, shoulder_top),
            DVec2::new(b1 / 2.0, 0.0),
            DVec2::new(b / 2.0, 0.0),
            DVec2::new(b / 2.0, b - l),
            DVec2::new(b / 4.0, -l),
            DVec2::new(-b / 4.0, -l),
            DVec2::new(-b / 2.0, b - l),
            DVec2::new(-b / 2.0, 0.0),
            DVec2::new(-b1 / 2.0, 0.0),
            DVec2::new(-b1 / 2.0, shoulder_top),
        ],
        true,
    )
}

/// YZ outline of the bent lead, rounded at both bend corners
fn lead_bend_profile(p: &DipParams, shoulder_top: f64) -> Result<Wire2D, GenerateError> {
    let c = LEAD_THICKNESS;
    let half = p.e / 2.0;
    Ok(PathBuilder::move_to(DVec2::new(0.0, shoulder_top))
        .line_to(DVec2::new(half, shoulder_top))
        .round(1.5 * c)
        .line_to(DVec2::new(half, -LEAD_LENGTH))
        .line_to(DVec2::new(half - c, -LEAD_LENGTH))
        .line_to(DVec2::new(half - c, shoulder_top - c))
        .round(c / 2.0)
        .line_to(DVec2::new(0.0, shoulder_top - c))
        .close()?)
}

/// One row of pins on the +Y side, first pin at +X
fn build_pin_row(kernel: &dyn CadKernel, p: &DipParams) -> Result<Solid, GenerateError> {
    let shoulder_top = p.a1 + (p.a2 + LEAD_THICKNESS) / 2.0;
    let half = p.e / 2.0;
    let per_row = p.npins / 2;
    let x1 = p.pitch * (p.npins as f64 / 4.0 - 0.5);

    let sweep = |profile: &Wire2D, x: f64| {
        let plane = SketchPlane::xz().at(DVec3::new(x, half, 0.0));
        kernel.extrude(profile, &plane, half)
    };

    let end = end_pin_profile(p, shoulder_top);
    let inner = inner_pin_profile(p, shoulder_top);
    let mut pins = vec![sweep(&end, x1)?];
    for i in 1..per_row - 1 {
        pins.push(sweep(&inner, x1 - p.pitch * i as f64)?);
    }
    pins.push(sweep(&end.mirrored_x(), -x1)?);
    let row = kernel.union_all(&pins)?;

    let reach = x1 + p.b1;
    let bend_plane = SketchPlane::yz().at(DVec3::new(-reach, 0.0, 0.0));
    let bend = kernel.extrude(&lead_bend_profile(p, shoulder_top)?, &bend_plane, 2.0 * reach)?;
    Ok(kernel.boolean(&row, &bend, BooleanType::Intersect)?)
}

impl Generator for DipGenerator {
    fn family(&self) -> &'static str {
        "dip"
    }

    fn pin_count(&self) -> usize {
        self.params.npins
    }

    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError> {
        let p = &self.params;
        p.validate()?;
        debug!(d = p.d, npins = p.npins, "Generating DIP");

        let sections = CaseSections::new(p);
        let case = build_case(kernel, p, &sections)?;

        let row = build_pin_row(kernel, p)?;
        let opposite = kernel.rotate(&row, &Axis3D::z(), std::f64::consts::PI)?;
        let pins = kernel.union_all(&[row, opposite])?;
        debug!("DIP pins built");

        let case = kernel.boolean(&case, &pins, BooleanType::Subtract)?;

        let mut model = ComponentModel::new();
        model.add_part(case, CASE_COLOR, "body");
        model.add_part(pins, PIN_COLOR, "pins");
        Ok(model)
    }
}
