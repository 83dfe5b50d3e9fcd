//! Electrolytic capacitors: radial leaded and radial SMD (V-chip)
//!
//! Both bodies are `(r, z)` profiles revolved about Z, with the cathode
//! marking on the -X side.

pub mod radial;
pub mod smd;

pub use radial::{RadialCapGenerator, RadialCapParams};
pub use smd::{SmdCapGenerator, SmdCapParams};
