//! Component model export
//!
//! A model is tessellated part by part, rendered to an in-memory document
//! and written to disk in one call, so a failure never leaves a partial file.

mod options;
mod stl;
mod vrml;
mod x3d;
mod xml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use e3d_cad::{CadError, CadKernel, TessellatedMesh};
use tracing::{debug, info, warn};

use crate::appearance::Appearance;
use crate::model::ComponentModel;

pub use options::ExportOptions;
pub use xml::{node_name, sanitize_filename, xml_escape};

/// Output file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Stl,
    Vrml,
    X3d,
}

impl ExportFormat {
    pub const ALL: &'static [ExportFormat] =
        &[ExportFormat::Stl, ExportFormat::Vrml, ExportFormat::X3d];

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Stl => "stl",
            ExportFormat::Vrml => "wrl",
            ExportFormat::X3d => "x3d",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Stl => "STL",
            ExportFormat::Vrml => "VRML",
            ExportFormat::X3d => "X3D",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.to_ascii_lowercase().as_str() {
            "stl" => Ok(ExportFormat::Stl),
            "vrml" | "wrl" => Ok(ExportFormat::Vrml),
            "x3d" => Ok(ExportFormat::X3d),
            _ => Err(ExportError::UnsupportedFormat(tag.to_string())),
        }
    }
}

/// Export-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("Component model has no parts")]
    EmptyModel,
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),
    #[error("Kernel error: {0}")]
    Kernel(#[from] CadError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Mesh export failed: {0}")]
    MeshExport(String),
}

/// Tessellated part handed to a writer
#[derive(Debug, Clone)]
pub(crate) struct MeshPart {
    pub name: String,
    pub appearance: Appearance,
    pub mesh: TessellatedMesh,
}

/// Write `model` to `path` in the given format
pub fn export(
    kernel: &dyn CadKernel,
    format: ExportFormat,
    component_name: &str,
    model: &ComponentModel,
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    if model.is_empty() {
        return Err(ExportError::EmptyModel);
    }
    options.validate().map_err(ExportError::InvalidOptions)?;

    let parts = mesh_parts(kernel, component_name, model, options)?;
    let bytes = match format {
        ExportFormat::Stl => stl::render(&parts)?,
        ExportFormat::Vrml => vrml::render(&parts).into_bytes(),
        ExportFormat::X3d => x3d::render(&parts).into_bytes(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExportError::Io(e.to_string()))?;
    }
    std::fs::write(path, &bytes).map_err(|e| ExportError::Io(e.to_string()))?;

    info!(
        path = %path.display(),
        format = %format,
        parts = parts.len(),
        bytes = bytes.len(),
        "Exported component"
    );
    Ok(())
}

/// Apply the fuse policy, then tessellate and scale every part
fn mesh_parts(
    kernel: &dyn CadKernel,
    component_name: &str,
    model: &ComponentModel,
    options: &ExportOptions,
) -> Result<Vec<MeshPart>, ExportError> {
    let parts = model.parts();
    let solids = if options.fuse && parts.len() > 1 {
        let first = parts[0].color.appearance();
        if parts.iter().any(|p| p.color.appearance() != first) {
            warn!(
                component = component_name,
                "Fusing parts with different appearances, keeping the first"
            );
        }
        let all: Vec<_> = parts.iter().map(|p| p.solid).collect();
        let fused = kernel.union_all(&all)?;
        vec![(component_name.to_string(), first, fused)]
    } else {
        parts
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let name = match &p.name {
                    Some(name) => format!("{component_name}_{name}"),
                    None => format!("{component_name}_part{}", i + 1),
                };
                (name, p.color.appearance(), p.solid)
            })
            .collect()
    };

    solids
        .into_iter()
        .map(|(name, appearance, solid)| {
            let mut mesh = kernel.tessellate(&solid, options.tolerance)?;
            if let Some(scale) = options.scale {
                mesh.scale(scale as f32);
            }
            debug!(part = %name, triangles = mesh.triangle_count(), "Tessellated part");
            Ok(MeshPart {
                name,
                appearance,
                mesh,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appearance::Appearance;
    use e3d_cad::{ImplicitKernel, NullKernel, Solid};
    use glam::DVec3;
    use tempfile::TempDir;

    fn cube(kernel: &ImplicitKernel, center: DVec3) -> Solid {
        kernel.create_box(center, DVec3::splat(1.0)).unwrap()
    }

    fn two_part_model(kernel: &ImplicitKernel) -> ComponentModel {
        let mut model = ComponentModel::new();
        model.add_part(cube(kernel, DVec3::ZERO), [0.1_f32; 3], "body");
        model.add_part(cube(kernel, DVec3::new(2.0, 0.0, 0.0)), [0.9_f32; 3], "pins");
        model
    }

    #[test]
    fn test_format_tags() {
        assert_eq!("STL".parse::<ExportFormat>().unwrap(), ExportFormat::Stl);
        assert_eq!("wrl".parse::<ExportFormat>().unwrap(), ExportFormat::Vrml);
        assert_eq!("vrml".parse::<ExportFormat>().unwrap(), ExportFormat::Vrml);
        assert_eq!("X3d".parse::<ExportFormat>().unwrap(), ExportFormat::X3d);
        for tag in ["step", "freecad", ""] {
            assert!(matches!(
                tag.parse::<ExportFormat>(),
                Err(ExportError::UnsupportedFormat(_))
            ));
        }
        assert_eq!(ExportFormat::Vrml.extension(), "wrl");
    }

    #[test]
    fn test_unsupported_format_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.step");
        let result = "step".parse::<ExportFormat>().and_then(|format| {
            let kernel = ImplicitKernel::new();
            let model = two_part_model(&kernel);
            export(&kernel, format, "c", &model, &path, &ExportOptions::default())
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_model_rejected_before_kernel_work() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.stl");
        // the null kernel would fail on any call
        let result = export(
            &NullKernel,
            ExportFormat::Stl,
            "empty",
            &ComponentModel::new(),
            &path,
            &ExportOptions::default(),
        );
        assert!(matches!(result, Err(ExportError::EmptyModel)));
        assert!(!path.exists());
    }

    #[test]
    fn test_kernel_failure_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("fail.wrl");
        let kernel = ImplicitKernel::new();
        let model = two_part_model(&kernel);
        let result = export(
            &NullKernel,
            ExportFormat::Vrml,
            "fail",
            &model,
            &path,
            &ExportOptions::default(),
        );
        assert!(matches!(result, Err(ExportError::Kernel(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_options() {
        let kernel = ImplicitKernel::new();
        let model = two_part_model(&kernel);
        let dir = TempDir::new().unwrap();
        for options in [
            ExportOptions::default().with_tolerance(0.0),
            ExportOptions::default().with_scale(Some(-1.0)),
        ] {
            let result = export(&kernel, ExportFormat::Stl, "c", &model, dir.path().join("c.stl"), &options);
            assert!(matches!(result, Err(ExportError::InvalidOptions(_))));
        }
    }

    #[test]
    fn test_part_naming_without_fuse() {
        let kernel = ImplicitKernel::new();
        let mut model = two_part_model(&kernel);
        model.add_unnamed_part(cube(&kernel, DVec3::new(-2.0, 0.0, 0.0)), [0.5_f32; 3]);
        let options = ExportOptions::default().with_fuse(false);
        let parts = mesh_parts(&kernel, "DIP08", &model, &options).unwrap();
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["DIP08_body", "DIP08_pins", "DIP08_part3"]);
        assert_eq!(parts[1].appearance, Appearance::new([0.9; 3]));
    }

    #[test]
    fn test_fuse_keeps_first_appearance() {
        let kernel = ImplicitKernel::new();
        let model = two_part_model(&kernel);
        let parts = mesh_parts(&kernel, "DIP08", &model, &ExportOptions::default()).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "DIP08");
        assert_eq!(parts[0].appearance.diffuse_color(), [0.1; 3]);
    }

    #[test]
    fn test_single_part_never_fused() {
        let kernel = ImplicitKernel::new();
        let mut model = ComponentModel::new();
        model.add_part(cube(&kernel, DVec3::ZERO), [1.0_f32, 0.0, 0.0], "Body");
        let parts = mesh_parts(&kernel, "cube", &model, &ExportOptions::default()).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "cube_Body");
    }

    #[test]
    fn test_scale_applied_to_mesh() {
        let kernel = ImplicitKernel::new();
        let mut model = ComponentModel::new();
        model.add_part(cube(&kernel, DVec3::ZERO), [1.0_f32; 3], "Body");
        let options = ExportOptions::default().with_scale(Some(2.0));
        let parts = mesh_parts(&kernel, "cube", &model, &options).unwrap();
        let max_x = parts[0]
            .mesh
            .vertices
            .iter()
            .map(|v| v[0])
            .fold(f32::MIN, f32::max);
        assert!((max_x - 1.0).abs() < 0.1, "max x {max_x}");
    }

    #[test]
    fn test_export_writes_all_formats() {
        let kernel = ImplicitKernel::new();
        let model = two_part_model(&kernel);
        let dir = TempDir::new().unwrap();
        let options = ExportOptions::default().with_fuse(false);
        for format in ExportFormat::ALL {
            let path = dir
                .path()
                .join("dip")
                .join(format!("DIP08.{}", format.extension()));
            export(&kernel, *format, "DIP08", &model, &path, &options).unwrap();
            let bytes = std::fs::read(&path).unwrap();
            assert!(!bytes.is_empty(), "{format}");
        }
        let x3d = std::fs::read_to_string(dir.path().join("dip").join("DIP08.x3d")).unwrap();
        assert_eq!(x3d.matches("<Shape ").count(), 2);
    }
}
