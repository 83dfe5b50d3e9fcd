//! Generator contract

use e3d_cad::{CadError, CadKernel};
use thiserror::Error;

use crate::model::ComponentModel;

/// Generation errors
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Geometry construction failed: {0}")]
    Kernel(#[from] CadError),
}

/// Turns a fixed parameter record into a component model.
///
/// Generators hold no mutable state: repeated calls produce identical
/// geometry. The kernel is passed per call so that concurrent generations
/// can each use their own kernel context.
pub trait Generator: Send + Sync {
    /// Package family identifier (e.g. `"dip"`)
    fn family(&self) -> &'static str;

    /// Total number of pins the generated component carries
    fn pin_count(&self) -> usize;

    /// Build the component model
    fn generate(&self, kernel: &dyn CadKernel) -> Result<ComponentModel, GenerateError>;
}

/// Fail with `InvalidParameters` unless every named value is positive and finite
pub(crate) fn require_positive(values: &[(&str, f64)]) -> Result<(), GenerateError> {
    for (name, value) in values {
        if !(*value > 0.0 && value.is_finite()) {
            return Err(GenerateError::InvalidParameters(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    Ok(())
}

/// Fail with `InvalidParameters` carrying `message` when `condition` is false
pub(crate) fn require(condition: bool, message: impl FnOnce() -> String) -> Result<(), GenerateError> {
    if condition {
        Ok(())
    } else {
        Err(GenerateError::InvalidParameters(message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        assert!(require_positive(&[("a", 1.0), ("b", 0.5)]).is_ok());
        let err = require_positive(&[("a", 1.0), ("b", -0.5)]).unwrap_err();
        assert!(err.to_string().contains("b must be positive"));
        assert!(require_positive(&[("nan", f64::NAN)]).is_err());
    }

    #[test]
    fn test_kernel_error_converts() {
        let err: GenerateError = CadError::BooleanFailed("empty".into()).into();
        assert!(matches!(err, GenerateError::Kernel(_)));
    }
}
