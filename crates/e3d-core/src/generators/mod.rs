//! Package family generators
//!
//! Each family owns its CSG algorithm. The only shared pieces are the
//! chamfered-rectangle profile (see [`e3d_cad::Wire2D::chamfered_rect`]) and
//! the pin-row replication used by the quad packages.

pub mod box_body;
pub mod capacitor;
pub mod dip;
pub mod qfn;
pub mod qfp;

pub use box_body::{BoxGenerator, BoxParams};
pub use capacitor::{RadialCapGenerator, RadialCapParams, SmdCapGenerator, SmdCapParams};
pub use dip::{DipGenerator, DipParams};
pub use qfn::{QfnCase, QfnGenerator, QfnParams};
pub use qfp::{QfpGenerator, QfpParams};

use std::f64::consts::{FRAC_PI_2, PI};

use e3d_cad::{Axis3D, CadKernel, CadResult, Solid};
use glam::DVec3;

/// Copies of `pin` spread along X at `pitch`, centered on the origin
pub(crate) fn pin_row(
    kernel: &dyn CadKernel,
    pin: &Solid,
    count: usize,
    pitch: f64,
) -> CadResult<Solid> {
    let first = -(count as f64 - 1.0) * pitch / 2.0;
    let pins = (0..count)
        .map(|i| kernel.translate(pin, DVec3::new(first + i as f64 * pitch, 0.0, 0.0)))
        .collect::<CadResult<Vec<_>>>()?;
    kernel.union_all(&pins)
}

/// Pins on all four sides of a quad package.
///
/// `top_pin` sits on the +Y side and is replicated `npx` times, then turned
/// 180° for the opposite side. `side_pin` is also modelled on the +Y side,
/// replicated `npy` times, and turned 90° and 270° onto the X sides.
/// The result equals building each side row in place and uniting the four.
pub(crate) fn quad_pins(
    kernel: &dyn CadKernel,
    top_pin: &Solid,
    side_pin: &Solid,
    pitch: f64,
    npx: usize,
    npy: usize,
) -> CadResult<Solid> {
    let z = Axis3D::z();
    let top = pin_row(kernel, top_pin, npx, pitch)?;
    let bottom = kernel.rotate(&top, &z, PI)?;
    let side = pin_row(kernel, side_pin, npy, pitch)?;
    let left = kernel.rotate(&side, &z, FRAC_PI_2)?;
    let right = kernel.rotate(&side, &z, 3.0 * FRAC_PI_2)?;
    kernel.union_all(&[top, bottom, left, right])
}
