//! Solid-Modeling Kernel Abstraction and Sketch Values
//!
//! This crate provides:
//! - Abstract CAD kernel trait for CSG operations
//! - An implicit (signed distance) kernel that needs no native libraries
//! - Sketch planes, 2D wires and a path builder for profiles

pub mod kernel;
pub mod sketch;

// Re-exports for convenience
pub use kernel::{
    Axis3D, BooleanType, BoundingBox, CadError, CadKernel, CadResult, EdgeSelector,
    ImplicitKernel, NullKernel, Solid, TessellatedMesh, Wire2D, default_kernel,
};
pub use sketch::{PathBuilder, SketchPlane};
