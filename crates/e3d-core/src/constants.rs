//! Global constants for e3d-core

/// Default case color (near black)
pub const CASE_COLOR: [f32; 3] = [0.1, 0.1, 0.1];

/// Default pin color (light metal)
pub const PIN_COLOR: [f32; 3] = [0.9, 0.9, 0.9];

/// Default appearance ambient intensity
pub const DEFAULT_AMBIENT_INTENSITY: f32 = 0.2;

/// Default appearance shininess
pub const DEFAULT_SHININESS: f32 = 0.2;

/// Default tessellation tolerance in millimeters
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Standard mold draft angle of plastic bodies, in degrees
pub const BODY_DRAFT_DEG: f64 = 12.0;

/// Converts inches to millimeters
pub fn mm(inches: f64) -> f64 {
    inches * 25.4
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inch_conversion() {
        assert_relative_eq!(mm(0.3), 7.62, epsilon = 1e-12);
        assert_relative_eq!(mm(0.61), 15.494, epsilon = 1e-12);
    }
}
