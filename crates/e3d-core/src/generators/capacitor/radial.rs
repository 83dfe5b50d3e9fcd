//! Radial leaded electrolytic capacitor

use std::f64::consts::{PI, TAU};

use e3d_cad::{Axis3D, BooleanType, CadKernel, PathBuilder, SketchPlane, Solid, Wire2D};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generator::{GenerateError, Generator, require, require_positive};
use crate::model::ComponentModel;

pub const DEFAULT_LEAD_LENGTH: f64 = 4.0;
pub const DEFAULT_CATHODE_EXTRA: f64 = 1.0;
pub const DEFAULT_BOARD_SEPARATION: f64 = 1.0;

/// Chord half-length of the belt groove
pub const BELT_RADIUS: f64 = 0.7;
/// Groove depth into the can
pub const BELT_DEPTH: f64 = 0.5;
/// Groove centre above the can bottom
pub const BELT_HEIGHT: f64 = 1.5;
/// Thickness of the top and bottom plastic discs
pub const CAP_THICKNESS: f64 = 0.2;
/// Disc diameter relative to the can
pub const CAP_RATIO: f64 = 0.7;
pub const SLOT_WIDTH: f64 = 0.1;
pub const SLOT_DEPTH: f64 = 0.1;
pub const EDGE_FILLET: f64 = 0.2;
/// Angle covered by the cathode bar, degrees
pub const BAR_ANGLE: f64 = 45.0;
/// Vertical room per minus mark
pub const MARK_SPACING: f64 = 2.0;
pub const MARK_HEIGHT: f64 = 0.5;
pub const MARK_DEPTH: f64 = 0.1;

pub const BODY_COLOR: [f32; 3] = [0.797, 0.234, 0.234];
pub const BOTTOM_COLOR: [f32; 3] = [0.156, 0.156, 0.156];
pub const TOP_COLOR: [f32; 3] = [0.859, 0.859, 0.859];
pub const BAR_COLOR: [f32; 3] = [0.781, 0.781, 0.781];
pub const LEAD_COLOR: [f32; 3] = [0.938, 0.938, 0.938];

/// Radial capacitor dimensions in millimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialCapParams {
    /// Can height
    pub l: f64,
    /// Can diameter
    pub d: f64,
    /// Lead diameter
    pub lead_d: f64,
    /// Lead spacing
    pub f: f64,
    /// Lead length below the board
    pub lead_len: f64,
    /// Extra length of the cathode lead
    pub cathode_extra: f64,
    /// Gap between board and can
    pub board_sep: f64,
    pub body_color: [f32; 3],
}

impl RadialCapParams {
    pub fn new(d: f64, l: f64, f: f64, lead_d: f64) -> Self {
        Self {
            l,
            d,
            lead_d,
            f,
            lead_len: DEFAULT_LEAD_LENGTH,
            cathode_extra: DEFAULT_CATHODE_EXTRA,
            board_sep: DEFAULT_BOARD_SEPARATION,
            body_color: BODY_COLOR,
        }
    }

    fn validate(&self) -> Result<(), GenerateError> {
        require_positive(&[
            ("L", self.l),
            ("D", self.d),
            ("lead diameter", self.lead_d),
            ("F", self.f),
            ("lead length", self.lead_len),
            ("board separation", self.board_sep),
        ])?;
        require(self.cathode_extra >= 0.0, || {
            format!("cathode extra length must not be negative, got {}", self.cathode_extra)
        })?;
        let disc = CAP_RATIO * self.d / 2.0;
        require(self.f / 2.0 + self.lead_d / 2.0 < disc, || {
            format!("leads at spacing {} leave the {}mm can", self.f, self.d)
        })?;
        require(self.lead_d < self.f, || {
            format!("leads of {} overlap at spacing {}", self.lead_d, self.f)
        })?;
        require(self.l > BELT_HEIGHT + BELT_RADIUS + 2.0 * EDGE_FILLET, || {
            format!("can height {} too small for the belt", self.l)
        })?;
        require(self.d * (1.0 - CAP_RATIO) / 2.0 > EDGE_FILLET, || {
            format!("can diameter {} too small", self.d)
        })?;
        require(mark_length(self.d) > MARK_HEIGHT, || {
            format!("cathode bar too narrow for marks on a {}mm can", self.d)
        })
    }
}

/// Length of a minus mark across the bar
fn mark_length(d: f64) -> f64 {
    0.6 * d * (BAR_ANGLE.to_radians() / 2.0).sin()
}

/// Generator for [`RadialCapParams`]
#[derive(Debug, Clone)]
pub struct RadialCapGenerator {
    params: RadialCapParams,
}

impl RadialCapGenerator {
    pub fn new(params: RadialCapParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RadialCapParams {
        &self.params
    }

    fn bottom(&self) -> f64 {
        self.params.board_sep
    }

    fn top(&self) -> f64 {
        self.params.board_sep + self.params.l
    }

    /// Half outline of the can with recesses for both discs
    fn can_profile(&self) -> Result<Wire2D, GenerateError> {
        let p = &self.params;
        let (z0, z1) = (self.bottom(), self.top());
        let r = p.d / 2.0;
        let rc = CAP_RATIO * r;
        let zb = z0 + BELT_HEIGHT;
        Ok(PathBuilder::move_to(DVec2::new(0.0, z0 + CAP_THICKNESS))
            .line_to(DVec2::new(rc, z0 + CAP_THICKNESS))
            .line_to(DVec2::new(rc, z0))
            .line_to(DVec2::new(r, z0))
            .round(EDGE_FILLET)
            .line_to(DVec2::new(r, zb - BELT_RADIUS))
            .three_point_arc(DVec2::new(r - BELT_DEPTH, zb), DVec2::new(r, zb + BELT_RADIUS))
            .line_to(DVec2::new(r, z1))
            .round(EDGE_FILLET)
            .line_to(DVec2::new(rc, z1))
            .line_to(DVec2::new(rc, z1 - CAP_THICKNESS))
            .line_to(DVec2::new(0.0, z1 - CAP_THICKNESS))
            .close()?)
    }

    /// Revolve the can outline through `angle`, centred on `heading`
    fn can_sector(
        &self,
        kernel: &dyn CadKernel,
        profile: &Wire2D,
        angle: f64,
        heading: f64,
    ) -> Result<Solid, GenerateError> {
        let z = Axis3D::z();
        let sector = kernel.revolve(profile, &SketchPlane::xz(), &z, angle)?;
        Ok(kernel.rotate(&sector, &z, heading - angle / 2.0)?)
    }

    /// Minus marks stacked along the bar, above the belt
    fn marks(&self, kernel: &dyn CadKernel) -> Result<Option<Solid>, GenerateError> {
        let p = &self.params;
        let count = (p.l / (2.0 * MARK_SPACING)).floor() as usize;
        if count == 0 {
            return Ok(None);
        }
        let r = p.d / 2.0;
        let lo = self.bottom() + BELT_HEIGHT + BELT_RADIUS;
        let hi = self.top() - EDGE_FILLET;
        let step = (hi - lo) / count as f64;
        let half = mark_length(p.d) / 2.0;
        let rr = MARK_HEIGHT / 2.0;
        let outside = 0.5;
        let plane = SketchPlane::yz().at(DVec3::new(-r - outside, 0.0, 0.0));

        let mut marks = Vec::with_capacity(count);
        for k in 0..count {
            let zc = lo + (k as f64 + 0.5) * step;
            let (left, right) = (-half + rr, half - rr);
            let stadium = PathBuilder::move_to(DVec2::new(left, zc - rr))
                .line_to(DVec2::new(right, zc - rr))
                .arc_around(DVec2::new(right, zc), DVec2::new(right, zc + rr), true)
                .line_to(DVec2::new(left, zc + rr))
                .arc_around(DVec2::new(left, zc), DVec2::new(left, zc - rr), true)
                .close()?;
            marks.push(kernel.extrude(&stadium, &plane, outside + MARK_DEPTH)?);
        }
        Ok(Some(kernel.union_all(&marks)?))
    }

    /// Top disc with a plus-shaped vent slot
    fn top_disc(&self, kernel: &dyn CadKernel) -> Result<Solid, GenerateError> {
        let dc = CAP_RATIO * self.params.d;
        let z1 = self.top();
        let disc = kernel.create_cylinder(
            DVec3::new(0.0, 0.0, z1 - CAP_THICKNESS),
            dc / 2.0,
            CAP_THICKNESS,
            DVec3::Z,
        )?;
        let center = DVec3::new(0.0, 0.0, z1);
        let across = kernel.create_box(center, DVec3::new(dc, SLOT_WIDTH, 2.0 * SLOT_DEPTH))?;
        let along = kernel.create_box(center, DVec3::new(SLOT_WIDTH, dc, 2.0 * SLOT_DEPTH))?;
        let slot = kernel.boolean(&across, &along, BooleanType::Union)?;
        Ok(kernel.boolean(&disc, &slot, BooleanType::Subtract)?)
    }

    fn leads(&self, kernel: &dyn CadKernel) -> Result<Solid, GenerateError> {
        let p = &self.params;
        let radius = p.lead_d / 2.0;
        let anode_len = p.lead_len + p.board_sep;
        let cathode_len = anode_len + p.cathode_extra;
        let cathode = kernel.create_cylinder(
            DVec3::new(-p.f / 2.0, 0.0, -p.lead_len - p.cathode_extra),
            radius,
            cathode_len,
            DVec3::Z,
        )?;
        let anode = kernel.create_cylinder(
            DVec3::new(p.f / 2.0, 0.0, -p.lead_len),
            radius,
            anode_len,
            DVec3::Z,
        )?;
        Ok(kernel.boolean(&cathode, &anode, BooleanType::Union)?)
    }
}

impl Generator for RadialCapGenerator {
    fn family(&self) -> &'static str {
        "capacitor.radial"
    }

    fn pin_count(&self) -> usize {
        2
    }

    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError> {
        let p = &self.params;
        p.validate()?;
        debug!(d = p.d, l = p.l, f = p.f, "Generating radial capacitor");

        let profile = self.can_profile()?;
        let bar_angle = BAR_ANGLE.to_radians();
        let mut body = self.can_sector(kernel, &profile, TAU - bar_angle, 0.0)?;
        let mut bar = self.can_sector(kernel, &profile, bar_angle, PI)?;
        if let Some(marks) = self.marks(kernel)? {
            let inlay = kernel.boolean(&bar, &marks, BooleanType::Intersect)?;
            bar = kernel.boolean(&bar, &marks, BooleanType::Subtract)?;
            body = kernel.boolean(&body, &inlay, BooleanType::Union)?;
        }
        debug!("Capacitor can built");

        let top = self.top_disc(kernel)?;
        let bottom = kernel.create_cylinder(
            DVec3::new(0.0, 0.0, self.bottom()),
            CAP_RATIO * p.d / 2.0,
            CAP_THICKNESS,
            DVec3::Z,
        )?;
        let pins = self.leads(kernel)?;

        let mut model = ComponentModel::new();
        model.add_part(body, p.body_color, "body");
        model.add_part(top, TOP_COLOR, "top");
        model.add_part(bottom, BOTTOM_COLOR, "bottom");
        model.add_part(bar, BAR_COLOR, "bar");
        model.add_part(pins, LEAD_COLOR, "pins");
        Ok(model)
    }
}
