//! e3d-core: parametric 3D models of electronic component packages
//!
//! Generators turn a parameter record into a [`ComponentModel`]: an ordered
//! list of named, colored solids. The registry maps preset names to
//! parameter records and the export module writes models to mesh formats.

pub mod appearance;
pub mod constants;
pub mod export;
pub mod generator;
pub mod generators;
pub mod model;
pub mod registry;

pub use appearance::{Appearance, PartColor};
pub use export::{ExportError, ExportFormat, ExportOptions, export};
pub use generator::{GenerateError, Generator};
pub use model::{ComponentModel, Part};
pub use registry::{PackageParams, Registry, RegistryError};
