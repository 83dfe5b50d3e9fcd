//! Subcommand implementations

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use e3d_cad::ImplicitKernel;
use e3d_core::registry::Entry;
use e3d_core::{
    ExportError, ExportFormat, ExportOptions, GenerateError, Registry, RegistryError, export,
};

use crate::config::CliConfig;

/// Target of `make` that selects every preset
pub const ALL: &str = "all";

/// Errors from a single command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("failed to format parameters: {0}")]
    Format(#[from] ron::Error),
    #[error("{failed} of {total} components failed")]
    Batch { failed: usize, total: usize },
}

/// Failure while building one component
#[derive(Debug, Error)]
pub enum MakeError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Fully resolved settings for `make`
#[derive(Debug, Clone, PartialEq)]
pub struct MakeSettings {
    /// Every component is written once per format
    pub formats: Vec<ExportFormat>,
    pub outdir: PathBuf,
    pub options: ExportOptions,
}

/// Command-line overrides for `make`
#[derive(Debug, Clone, Default)]
pub struct MakeOverrides {
    pub formats: Vec<String>,
    pub outdir: Option<PathBuf>,
    pub scale: Option<f64>,
    pub dont_fuse: bool,
    pub tolerance: Option<f64>,
}

impl MakeSettings {
    /// Merge flags over config file values over built-in defaults
    pub fn resolve(overrides: &MakeOverrides, config: &CliConfig) -> Result<Self, ExportError> {
        let tags: &[String] = if !overrides.formats.is_empty() {
            &overrides.formats
        } else {
            config.formats.as_deref().unwrap_or_default()
        };
        let mut formats: Vec<ExportFormat> = Vec::new();
        for tag in tags {
            let format = tag.parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            formats = ExportFormat::ALL.to_vec();
        }
        let defaults = ExportOptions::default();
        let options = ExportOptions {
            fuse: !overrides.dont_fuse && config.fuse.unwrap_or(defaults.fuse),
            scale: overrides.scale.or(config.scale),
            tolerance: overrides
                .tolerance
                .or(config.tolerance)
                .unwrap_or(defaults.tolerance),
        };
        let outdir = overrides
            .outdir
            .clone()
            .or_else(|| config.outdir.clone())
            .unwrap_or_else(|| PathBuf::from("output"));
        Ok(Self {
            formats,
            outdir,
            options,
        })
    }

    /// Destination file of one entry in one format
    pub fn output_path(&self, entry: &Entry, format: ExportFormat) -> PathBuf {
        self.outdir
            .join(entry.output_dir())
            .join(format!("{}.{}", entry.name, format.extension()))
    }
}

/// `e3d list [PREFIX]`
pub fn list(registry: &Registry, prefix: Option<&str>) -> Result<(), CommandError> {
    let entries = match prefix {
        Some(prefix) => registry.find(prefix)?,
        None => registry.all().iter().collect(),
    };
    for entry in entries {
        let pins = entry.params.generator().pin_count();
        println!("{:<32} {:>3} pins", entry.id(), pins);
    }
    Ok(())
}

/// `e3d show COMPONENT`
pub fn show(registry: &Registry, id: &str) -> Result<(), CommandError> {
    let entry = registry.get(id)?;
    let text = ron::ser::to_string_pretty(&entry.params, ron::ser::PrettyConfig::default())?;
    println!("{text}");
    Ok(())
}

/// `e3d make TARGET`: generate and export every selected preset.
///
/// A failing component is logged and skipped; the batch fails at the end
/// if anything went wrong.
pub fn make(registry: &Registry, target: &str, settings: &MakeSettings) -> Result<(), CommandError> {
    let entries = if target == ALL {
        registry.all().iter().collect()
    } else {
        registry.find(target)?
    };

    let total = entries.len();
    let mut failed = 0;
    for entry in entries {
        info!(component = %entry.id(), "Making");
        match make_one(entry, settings) {
            Ok(paths) => {
                for path in paths {
                    println!("{} -> {}", entry.id(), path.display());
                }
            }
            Err(e) => {
                failed += 1;
                error!(component = %entry.id(), error = %e, "Component failed");
            }
        }
    }

    if failed > 0 {
        Err(CommandError::Batch { failed, total })
    } else {
        info!(total, "Done");
        Ok(())
    }
}

/// Generate one preset with its own kernel and export it in every format
pub fn make_one(entry: &Entry, settings: &MakeSettings) -> Result<Vec<PathBuf>, MakeError> {
    let kernel = ImplicitKernel::new();
    let model = entry.params.generator().generate(&kernel)?;
    let mut paths = Vec::with_capacity(settings.formats.len());
    for format in &settings.formats {
        let path = settings.output_path(entry, *format);
        export(&kernel, *format, entry.name, &model, &path, &settings.options)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = MakeSettings::resolve(&MakeOverrides::default(), &CliConfig::default()).unwrap();
        assert_eq!(settings.formats, ExportFormat::ALL);
        assert_eq!(settings.outdir, Path::new("output"));
        assert_eq!(settings.options, ExportOptions::default());
    }

    #[test]
    fn test_flags_override_config() {
        let config = CliConfig {
            outdir: Some("from-config".into()),
            formats: Some(vec!["vrml".into()]),
            scale: Some(0.5),
            fuse: Some(true),
            tolerance: Some(0.1),
            log_level: None,
        };
        let overrides = MakeOverrides {
            formats: vec!["x3d".into(), "STL".into(), "x3d".into()],
            outdir: None,
            scale: Some(2.0),
            dont_fuse: true,
            tolerance: None,
        };
        let settings = MakeSettings::resolve(&overrides, &config).unwrap();
        assert_eq!(settings.formats, vec![ExportFormat::X3d, ExportFormat::Stl]);
        assert_eq!(settings.outdir, Path::new("from-config"));
        assert_eq!(settings.options.scale, Some(2.0));
        assert!(!settings.options.fuse);
        assert_eq!(settings.options.tolerance, 0.1);
    }

    #[test]
    fn test_unsupported_format_tag() {
        let overrides = MakeOverrides {
            formats: vec!["stl".into(), "step".into()],
            ..Default::default()
        };
        assert!(matches!(
            MakeSettings::resolve(&overrides, &CliConfig::default()),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_output_path_follows_family() {
        let registry = Registry::builtin();
        let settings = MakeSettings {
            formats: vec![ExportFormat::Vrml],
            outdir: PathBuf::from("out"),
            options: ExportOptions::default(),
        };
        let entry = registry.get("qfp.jedec:AKA").unwrap();
        assert_eq!(
            settings.output_path(entry, ExportFormat::Vrml),
            Path::new("out").join("qfp").join("jedec").join("AKA.wrl")
        );
    }

    #[test]
    fn test_make_writes_file() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::builtin();
        let settings = MakeSettings {
            formats: vec![ExportFormat::Stl],
            outdir: dir.path().to_path_buf(),
            options: ExportOptions::default().with_tolerance(0.5),
        };
        make(&registry, "test:cube5x5x5", &settings).unwrap();
        assert!(dir.path().join("test").join("cube5x5x5.stl").exists());
        assert!(!dir.path().join("test").join("cube5x5x5.wrl").exists());
    }

    #[test]
    fn test_make_writes_every_format_by_default() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::builtin();
        let overrides = MakeOverrides {
            outdir: Some(dir.path().to_path_buf()),
            tolerance: Some(0.5),
            ..Default::default()
        };
        let settings = MakeSettings::resolve(&overrides, &CliConfig::default()).unwrap();
        let entry = registry.get("test:cube5x5x5").unwrap();
        let paths = make_one(entry, &settings).unwrap();
        assert_eq!(paths.len(), ExportFormat::ALL.len());
        for ext in ["stl", "wrl", "x3d"] {
            assert!(dir.path().join("test").join(format!("cube5x5x5.{ext}")).exists());
        }
    }

    #[test]
    fn test_make_unknown_target() {
        let registry = Registry::builtin();
        let settings = MakeSettings::resolve(&MakeOverrides::default(), &CliConfig::default()).unwrap();
        assert!(matches!(
            make(&registry, "sot23", &settings),
            Err(CommandError::Registry(RegistryError::UnknownFamily(_)))
        ));
    }
}
