//! Radial SMD electrolytic capacitor (V-chip)
//!
//! An aluminium can standing on a square plastic base. The base has its
//! two anode-side corners cut; two flat pins run under the base and bend up
//! into it.

use std::f64::consts::{PI, TAU};

use e3d_cad::{Axis3D, BooleanType, CadKernel, EdgeSelector, PathBuilder, SketchPlane, Solid, Wire2D};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::PIN_COLOR;
use crate::generator::{GenerateError, Generator, require, require_positive};
use crate::model::ComponentModel;

/// Belt groove centre above the base
pub const BELT_HEIGHT: f64 = 0.8;
/// Chord half-length of the belt groove
pub const BELT_RADIUS: f64 = 0.25;
pub const BELT_DEPTH: f64 = 0.15;
pub const TOP_FILLET: f64 = 0.3;
/// Anode-side base corner cut, relative to the base side
pub const BASE_CHAMFER_RATIO: f64 = 0.2;
pub const BASE_FILLET: f64 = 0.1;
/// Bore under the can, relative to the can diameter
pub const BORE_RATIO: f64 = 0.3;
/// Width of the anode-side step, relative to the base side
pub const STEP_RATIO: f64 = 0.125;
/// Inner edge of the cathode mark, relative to the can radius
pub const MARK_RATIO: f64 = 0.6;

pub const BODY_COLOR: [f32; 3] = [0.81, 0.81, 0.82];
pub const MARK_COLOR: [f32; 3] = [0.05, 0.05, 0.05];
pub const BASE_COLOR: [f32; 3] = [0.2, 0.2, 0.2];

/// SMD capacitor dimensions in millimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmdCapParams {
    /// Can diameter
    pub d: f64,
    /// Overall height, base included
    pub h: f64,
    /// Base side length
    pub a: f64,
    /// Base thickness
    pub base_h: f64,
    pub pin_w: f64,
    /// Pin length from its inner bend to the tip
    pub pin_l: f64,
    /// Pin metal thickness
    pub pin_t: f64,
    /// Gap between the inner ends of the two pins
    pub p: f64,
}

impl SmdCapParams {
    fn preset(d: f64, h: f64, a: f64, pin_w: f64, pin_l: f64, p: f64) -> Self {
        Self {
            d,
            h,
            a,
            base_h: 0.5,
            pin_w,
            pin_l,
            pin_t: 0.2,
            p,
        }
    }

    pub fn d4_h5_4() -> Self {
        Self::preset(4.0, 5.4, 4.3, 0.65, 1.8, 1.0)
    }

    pub fn d5_h5_4() -> Self {
        Self::preset(5.0, 5.4, 5.3, 0.65, 2.2, 1.5)
    }

    pub fn d6_3_h5_4() -> Self {
        Self::preset(6.3, 5.4, 6.6, 0.65, 2.6, 1.8)
    }

    pub fn d6_3_h7_7() -> Self {
        Self::preset(6.3, 7.7, 6.6, 0.65, 2.6, 1.8)
    }

    pub fn d8_h10() -> Self {
        Self::preset(8.0, 10.0, 8.3, 0.9, 3.0, 3.1)
    }

    pub fn d10_h10() -> Self {
        Self::preset(10.0, 10.0, 10.3, 0.9, 3.3, 4.6)
    }

    fn validate(&self) -> Result<(), GenerateError> {
        require_positive(&[
            ("D", self.d),
            ("H", self.h),
            ("A", self.a),
            ("base height", self.base_h),
            ("pin width", self.pin_w),
            ("pin length", self.pin_l),
            ("pin thickness", self.pin_t),
            ("pin gap", self.p),
        ])?;
        require(self.d <= self.a, || {
            format!("can of {} overhangs a base of {}", self.d, self.a)
        })?;
        require(
            self.h - self.base_h > BELT_HEIGHT + BELT_RADIUS + 2.0 * TOP_FILLET,
            || format!("height {} too small for the can", self.h),
        )?;
        require(self.base_h > 2.0 * self.pin_t, || {
            format!("base of {} too thin for pins of {}", self.base_h, self.pin_t)
        })?;
        require(self.p / 2.0 + self.pin_l > self.a / 2.0, || {
            format!("pins of {} do not reach past the base edge", self.pin_l)
        })?;
        require(self.pin_w < self.a * (1.0 - 2.0 * BASE_CHAMFER_RATIO), || {
            format!("pin width {} too large for the base", self.pin_w)
        })
    }
}

/// Generator for [`SmdCapParams`]
#[derive(Debug, Clone)]
pub struct SmdCapGenerator {
    params: SmdCapParams,
}

impl SmdCapGenerator {
    pub fn new(params: SmdCapParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SmdCapParams {
        &self.params
    }

    fn can(&self, kernel: &dyn CadKernel) -> Result<Solid, GenerateError> {
        let p = &self.params;
        let r = p.d / 2.0;
        let zb = p.base_h + BELT_HEIGHT;
        let profile = PathBuilder::move_to(DVec2::new(0.0, p.base_h))
            .line_to(DVec2::new(r, p.base_h))
            .line_to(DVec2::new(r, zb - BELT_RADIUS))
            .three_point_arc(DVec2::new(r - BELT_DEPTH, zb), DVec2::new(r, zb + BELT_RADIUS))
            .line_to(DVec2::new(r, p.h))
            .round(TOP_FILLET)
            .line_to(DVec2::new(0.0, p.h))
            .close()?;
        Ok(kernel.revolve(&profile, &SketchPlane::xz(), &Axis3D::z(), TAU)?)
    }

    fn base(&self, kernel: &dyn CadKernel) -> Result<Solid, GenerateError> {
        let p = &self.params;
        let half = p.a / 2.0;
        let cut = BASE_CHAMFER_RATIO * p.a;
        let outline = Wire2D::new(
            vec![
                DVec2::new(-half, -half),
                DVec2::new(half - cut, -half),
                DVec2::new(half, -half + cut),
                DVec2::new(half, half - cut),
                DVec2::new(half - cut, half),
                DVec2::new(-half, half),
            ],
            true,
        );
        let base = kernel.extrude(&outline, &SketchPlane::xy(), p.base_h)?;
        let base = kernel.fillet(&base, EdgeSelector::Lateral, BASE_FILLET)?;

        let bore = kernel.create_cylinder(
            DVec3::new(0.0, 0.0, p.base_h / 2.0),
            BORE_RATIO * p.d,
            p.base_h,
            DVec3::Z,
        )?;
        let step_w = STEP_RATIO * p.a;
        let step = kernel.create_box(
            DVec3::new(half - step_w / 2.0 + 0.05, 0.0, p.base_h),
            DVec3::new(step_w + 0.1, p.a + 0.2, p.base_h),
        )?;
        let base = kernel.boolean(&base, &bore, BooleanType::Subtract)?;
        Ok(kernel.boolean(&base, &step, BooleanType::Subtract)?)
    }

    /// Anode pin on +X; the cathode pin is the same pin turned half a turn
    fn pins(&self, kernel: &dyn CadKernel) -> Result<Solid, GenerateError> {
        let p = &self.params;
        let (x0, t) = (p.p / 2.0, p.pin_t);
        let riser = 0.8 * p.base_h;
        let outline = PathBuilder::move_to(DVec2::new(x0 + t, riser))
            .line_to(DVec2::new(x0, riser))
            .line_to(DVec2::new(x0, 0.0))
            .round(1.5 * t)
            .line_to(DVec2::new(x0 + p.pin_l, 0.0))
            .line_to(DVec2::new(x0 + p.pin_l, t))
            .line_to(DVec2::new(x0 + t, t))
            .round(t / 2.0)
            .close()?;
        let plane = SketchPlane::xz().at(DVec3::new(0.0, p.pin_w / 2.0, 0.0));
        let anode = kernel.extrude(&outline, &plane, p.pin_w)?;
        let cathode = kernel.rotate(&anode, &Axis3D::z(), PI)?;
        Ok(kernel.boolean(&anode, &cathode, BooleanType::Union)?)
    }
}

impl Generator for SmdCapGenerator {
    fn family(&self) -> &'static str {
        "capacitor.smd"
    }

    fn pin_count(&self) -> usize {
        2
    }

    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError> {
        let p = &self.params;
        p.validate()?;
        debug!(d = p.d, h = p.h, a = p.a, "Generating SMD capacitor");

        let can = self.can(kernel)?;
        let r = p.d / 2.0;
        let outer = -r - 0.1;
        let inner = -MARK_RATIO * r;
        let mark_zone = kernel.create_box(
            DVec3::new((outer + inner) / 2.0, 0.0, (p.base_h + p.h + 0.1) / 2.0),
            DVec3::new(inner - outer, p.d + 0.2, p.h + 0.1 - p.base_h),
        )?;
        let mark = kernel.boolean(&can, &mark_zone, BooleanType::Intersect)?;
        let body = kernel.boolean(&can, &mark_zone, BooleanType::Subtract)?;
        debug!("Capacitor can built");

        let pins = self.pins(kernel)?;
        let base = self.base(kernel)?;
        let base = kernel.boolean(&base, &pins, BooleanType::Subtract)?;

        let mut model = ComponentModel::new();
        model.add_part(body, BODY_COLOR, "body");
        model.add_part(mark, MARK_COLOR, "mark");
        model.add_part(base, BASE_COLOR, "base");
        model.add_part(pins, PIN_COLOR, "pins");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use e3d_cad::ImplicitKernel;
    use crate::generators::testing::assert_repeatable;

    #[test]
    fn test_generation_is_repeatable() {
        assert_repeatable(&SmdCapGenerator::new(SmdCapParams::d6_3_h5_4()));
    }

    #[test]
    fn test_parts_in_order() {
        let kernel = ImplicitKernel::new();
        let generator = SmdCapGenerator::new(SmdCapParams::d6_3_h5_4());
        let model = generator.generate(&kernel).unwrap();
        assert_eq!(model.names(), vec!["body", "mark", "base", "pins"]);
        assert_eq!(generator.pin_count(), 2);
    }

    #[test]
    fn test_height_and_footprint() {
        let kernel = ImplicitKernel::new();
        let model = SmdCapGenerator::new(SmdCapParams::d5_h5_4())
            .generate(&kernel)
            .unwrap();
        let bb = model
            .iter()
            .map(|part| kernel.bounding_box(&part.solid).unwrap())
            .reduce(|a, b| a.union(&b))
            .unwrap();
        assert_relative_eq!(bb.max.z, 5.4, epsilon = 1e-9);
        assert_relative_eq!(bb.min.z, 0.0, epsilon = 1e-9);
        // pins stick out past the base on both sides
        assert_relative_eq!(bb.max.x, 0.75 + 2.2, epsilon = 1e-9);
        assert_relative_eq!(bb.min.x, -(0.75 + 2.2), epsilon = 1e-6);
    }

    #[test]
    fn test_mark_on_cathode_side() {
        let kernel = ImplicitKernel::new();
        let model = SmdCapGenerator::new(SmdCapParams::d8_h10())
            .generate(&kernel)
            .unwrap();
        let body = model.part("body").unwrap().solid;
        let mark = model.part("mark").unwrap().solid;

        let cathode = DVec3::new(-3.8, 0.0, 5.0);
        let anode = DVec3::new(3.8, 0.0, 5.0);
        assert!(kernel.contains_point(&mark, cathode).unwrap());
        assert!(!kernel.contains_point(&body, cathode).unwrap());
        assert!(kernel.contains_point(&body, anode).unwrap());
        assert!(!kernel.contains_point(&mark, anode).unwrap());
    }

    #[test]
    fn test_base_cut_for_pins_and_corners() {
        let kernel = ImplicitKernel::new();
        let params = SmdCapParams::d10_h10();
        let model = SmdCapGenerator::new(params.clone()).generate(&kernel).unwrap();
        let base = model.part("base").unwrap().solid;
        let pins = model.part("pins").unwrap().solid;

        let foot = DVec3::new(-(params.p / 2.0 + 1.0), 0.0, params.pin_t / 2.0);
        assert!(kernel.contains_point(&pins, foot).unwrap());
        assert!(!kernel.contains_point(&base, foot).unwrap());

        let half = params.a / 2.0 - 0.05;
        let z = params.base_h / 4.0;
        assert!(kernel.contains_point(&base, DVec3::new(-half + 0.1, half - 0.1, z)).unwrap());
        assert!(!kernel.contains_point(&base, DVec3::new(half - 0.1, half - 0.1, z)).unwrap());
    }

    #[test]
    fn test_can_wider_than_base_rejected() {
        let kernel = ImplicitKernel::new();
        let params = SmdCapParams {
            a: 3.0,
            ..SmdCapParams::d4_h5_4()
        };
        assert!(matches!(
            SmdCapGenerator::new(params).generate(&kernel),
            Err(GenerateError::InvalidParameters(_))
        ));
    }
}
