//! Export options

use crate::constants::DEFAULT_TOLERANCE;

/// Options controlling how a component model is written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Fuse all parts into one solid before export (ignored for single-part models)
    pub fuse: bool,
    /// Uniform scale applied to the tessellated output
    pub scale: Option<f64>,
    /// Tessellation tolerance in model units
    pub tolerance: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fuse: true,
            scale: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ExportOptions {
    pub fn with_fuse(mut self, fuse: bool) -> Self {
        self.fuse = fuse;
        self
    }

    pub fn with_scale(mut self, scale: Option<f64>) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reject non-finite or non-positive values
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if let Some(scale) = self.scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(format!("scale must be positive, got {scale}"));
            }
        }
        Ok(())
    }
}
