//! Plain box reference generator

use e3d_cad::{CadKernel, SketchPlane, Wire2D};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generator::{GenerateError, Generator, require_positive};
use crate::model::ComponentModel;

/// Dimensions of a plain box, centered at the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxParams {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub color: [f32; 3],
}

impl BoxParams {
    pub fn new(length: f64, width: f64, height: f64, color: [f32; 3]) -> Self {
        Self {
            length,
            width,
            height,
            color,
        }
    }

    /// Cube with edge `size`
    pub fn cube(size: f64, color: [f32; 3]) -> Self {
        Self::new(size, size, size, color)
    }
}

/// Generator for [`BoxParams`]
#[derive(Debug, Clone)]
pub struct BoxGenerator {
    params: BoxParams,
}

impl BoxGenerator {
    pub fn new(params: BoxParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoxParams {
        &self.params
    }
}

impl Generator for BoxGenerator {
    fn family(&self) -> &'static str {
        "box"
    }

    fn pin_count(&self) -> usize {
        0
    }

    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError> {
        let p = &self.params;
        require_positive(&[
            ("length", p.length),
            ("width", p.width),
            ("height", p.height),
        ])?;
        debug!(l = p.length, w = p.width, h = p.height, "Generating box");

        let plane = SketchPlane::xy().at(DVec3::new(0.0, 0.0, -p.height / 2.0));
        let profile = Wire2D::rectangle(DVec2::ZERO, p.length, p.width);
        let body = kernel.extrude(&profile, &plane, p.height)?;

        let mut model = ComponentModel::new();
        model.add_part(body, p.color, "Body");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e3d_cad::{CadError, ImplicitKernel, NullKernel};

    #[test]
    fn test_cube_bounds_exact() {
        let kernel = ImplicitKernel::new();
        let generator = BoxGenerator::new(BoxParams::cube(5.0, [1.0, 0.0, 0.0]));
        let model = generator.generate(&kernel).unwrap();

        assert_eq!(model.names(), vec!["Body"]);
        let bb = kernel.bounding_box(&model.parts()[0].solid).unwrap();
        assert_eq!(bb.min, DVec3::splat(-2.5));
        assert_eq!(bb.max, DVec3::splat(2.5));
        assert_eq!(model.parts()[0].color.diffuse(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let kernel = ImplicitKernel::new();
        let generator = BoxGenerator::new(BoxParams::new(2.0, 3.0, 4.0, [0.5; 3]));
        let a = generator.generate(&kernel).unwrap();
        let b = generator.generate(&kernel).unwrap();
        let va = kernel.volume(&a.parts()[0].solid).unwrap();
        let vb = kernel.volume(&b.parts()[0].solid).unwrap();
        assert_eq!(va, vb);
        assert!((va - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_size() {
        let kernel = ImplicitKernel::new();
        let generator = BoxGenerator::new(BoxParams::new(0.0, 1.0, 1.0, [0.5; 3]));
        assert!(matches!(
            generator.generate(&kernel),
            Err(GenerateError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_kernel_failure_propagates() {
        let generator = BoxGenerator::new(BoxParams::cube(1.0, [0.5; 3]));
        let err = generator.generate(&NullKernel).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Kernel(CadError::KernelNotAvailable(_))
        ));
    }
}
