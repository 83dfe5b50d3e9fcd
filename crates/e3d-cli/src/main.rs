//! e3d: generate 3D models of electronic component packages
//!
//! Looks up presets in the built-in registry and exports them as STL,
//! VRML or X3D files.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use e3d_core::Registry;

use crate::commands::{CommandError, MakeOverrides, MakeSettings};

/// Parametric 3D model generator for electronic packages.
#[derive(Parser, Debug)]
#[command(name = "e3d")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a RON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List presets, optionally under a family prefix such as `qfp`
    List {
        prefix: Option<String>,
    },
    /// Print the parameters of a preset
    Show {
        /// Preset id, `family:NAME`
        component: String,
    },
    /// Generate and export presets
    Make {
        /// `family:NAME`, a family prefix, or `all`
        target: String,

        /// Output format: stl, vrml or x3d; repeat for several [default: all]
        #[arg(short, long = "format", value_name = "FORMAT", value_delimiter = ',')]
        formats: Vec<String>,

        /// Output directory [default: output]
        #[arg(short, long)]
        outdir: Option<PathBuf>,

        /// Scale factor applied to the exported meshes
        #[arg(long)]
        scale: Option<f64>,

        /// Keep parts separate instead of fusing them
        #[arg(long)]
        dont_fuse: bool,

        /// Tessellation tolerance in millimetres
        #[arg(long)]
        tolerance: Option<f64>,
    },
}

/// Determines the log level from CLI arguments.
fn get_log_level(verbose: u8, quiet: bool, config_level: Option<&str>) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.map(str::to_lowercase).as_deref() {
            Some("trace") => Level::TRACE,
            Some("debug") => Level::DEBUG,
            Some("info") => Level::INFO,
            Some("error") => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(get_log_level(args.verbose, args.quiet, cfg.log_level.as_deref()));

    let registry = Registry::builtin();
    let result = match args.command {
        Command::List { prefix } => commands::list(&registry, prefix.as_deref()),
        Command::Show { component } => commands::show(&registry, &component),
        Command::Make {
            target,
            formats,
            outdir,
            scale,
            dont_fuse,
            tolerance,
        } => {
            let overrides = MakeOverrides {
                formats,
                outdir,
                scale,
                dont_fuse,
                tolerance,
            };
            MakeSettings::resolve(&overrides, &cfg)
                .map_err(CommandError::from)
                .and_then(|settings| commands::make(&registry, &target, &settings))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_log_level() {
        assert_eq!(get_log_level(0, false, None), Level::WARN);
        assert_eq!(get_log_level(0, false, Some("Debug")), Level::DEBUG);
        assert_eq!(get_log_level(2, false, Some("error")), Level::DEBUG);
        assert_eq!(get_log_level(3, true, None), Level::ERROR);
    }

    #[test]
    fn test_parse_make() {
        let args = Args::parse_from([
            "e3d", "make", "qfp", "--format", "x3d", "-f", "stl,vrml", "--dont-fuse", "-vv",
        ]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Make {
                target,
                formats,
                dont_fuse,
                ..
            } => {
                assert_eq!(target, "qfp");
                assert_eq!(formats, vec!["x3d", "stl", "vrml"]);
                assert!(dont_fuse);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
