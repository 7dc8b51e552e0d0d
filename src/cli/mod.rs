//! CLI interface and argument parsing
//!
//! This module provides the command-line interface of the exporter using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Exit code: run completed, health OK
pub const EXIT_OK: i32 = 0;
/// Exit code: run completed with skipped entities (health WARN)
pub const EXIT_WARN: i32 = 1;
/// Exit code: configuration could not be loaded or is invalid
pub const EXIT_CONFIG: i32 = 2;
/// Exit code: the index or the staging store could not be set up
pub const EXIT_INIT: i32 = 4;
/// Exit code: the run aborted (health FATAL)
pub const EXIT_FATAL: i32 = 5;

/// GAR export - school resource access interchange files
#[derive(Parser, Debug)]
#[command(name = "gar-export")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "gar-export.toml", env = "GAR_EXPORT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "GAR_EXPORT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and write the interchange files
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["gar-export", "export"]);
        assert_eq!(cli.config, "gar-export.toml");
        assert!(matches!(cli.command, Commands::Export(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["gar-export", "--config", "custom.toml", "export"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["gar-export", "--log-level", "debug", "export"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_export_overrides() {
        let cli = Cli::parse_from([
            "gar-export",
            "export",
            "--dry-run",
            "--output-dir",
            "/tmp/gar",
            "--nodes-per-file",
            "500",
        ]);
        match cli.command {
            Commands::Export(args) => {
                assert!(args.dry_run);
                assert_eq!(args.output_dir.as_deref(), Some("/tmp/gar"));
                assert_eq!(args.nodes_per_file, Some(500));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["gar-export", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["gar-export", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
