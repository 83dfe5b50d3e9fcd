//! Optional RON configuration file
//!
//! Every field is optional; values given on the command line take
//! precedence over the file.
//!
//! ```ron
//! (
//!     outdir: Some("models"),
//!     formats: Some(["vrml", "x3d"]),
//!     fuse: Some(false),
//!     tolerance: Some(0.02),
//!     log_level: Some("info"),
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read configuration file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file: {path}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("configuration validation failed: {message}")]
    ValidationError { message: String },
}

/// Defaults for the `make` command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub outdir: Option<PathBuf>,
    /// Format tags (`stl`, `vrml`, `x3d`)
    pub formats: Option<Vec<String>>,
    pub scale: Option<f64>,
    pub fuse: Option<bool>,
    pub tolerance: Option<f64>,
    /// Log level used when no `-v` flag is given
    pub log_level: Option<String>,
}

impl CliConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [("scale", self.scale), ("tolerance", self.tolerance)];
        for (name, value) in positive {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(ConfigError::ValidationError {
                        message: format!("{name} must be positive, got {v}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Load the configuration file, or defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: CliConfig = ron::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("e3d.ron");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"(formats: Some(["x3d"]), fuse: Some(false))"#);
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.formats, Some(vec!["x3d".to_string()]));
        assert_eq!(config.fuse, Some(false));
        assert_eq!(config.outdir, None);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("nope.ron"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "(colour: Some(1.0))");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "(tolerance: Some(-0.1))");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
