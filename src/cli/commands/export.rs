//! Export command implementation
//!
//! This module implements the `export` command: it runs every builder pass
//! and maps the run health to the process exit code.

use crate::cli::{EXIT_CONFIG, EXIT_FATAL, EXIT_INIT, EXIT_OK, EXIT_WARN};
use crate::config::{load_config, GarExportConfig};
use crate::core::export::{ExportCoordinator, ExportSummary};
use crate::domain::{GarError, Health};
use clap::Args;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Dry run mode - build and validate every file without writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Override the number of records per output file
    #[arg(long, value_name = "N")]
    pub nodes_per_file: Option<usize>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG);
        }

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no file will be written");
            println!("🔍 DRY RUN MODE - No file will be written");
            println!();
        }

        tracing::info!("Creating export coordinator");
        let coordinator = match ExportCoordinator::new(config).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(match e {
                    GarError::Configuration(_) => EXIT_CONFIG,
                    _ => EXIT_INIT,
                });
            }
        };

        println!("🚀 Starting export (run {})...", coordinator.run_id());
        println!();

        let summary = coordinator.execute_export().await?;
        print_summary(&summary);

        Ok(exit_code(summary.health))
    }

    fn apply_overrides(&self, config: &mut GarExportConfig) {
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Some(directory) = &self.output_dir {
            tracing::info!(directory = %directory, "Overriding output directory from CLI");
            config.output.directory = directory.clone();
        }

        if let Some(nodes) = self.nodes_per_file {
            tracing::info!(nodes_per_file = nodes, "Overriding nodes per file from CLI");
            config.output.nodes_per_file = nodes;
        }
    }
}

/// Exit code of a completed run
pub fn exit_code(health: Health) -> i32 {
    match health {
        Health::Ok => EXIT_OK,
        Health::Warn => EXIT_WARN,
        Health::Fatal => EXIT_FATAL,
    }
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("📊 Export Summary:");
    println!("  Run: {} ({})", summary.run_id, summary.timestamp);
    for report in &summary.categories {
        println!(
            "  {:<10} processed {:>6}  emitted {:>6}  restricted {:>6}  skipped {:>6}  files {:>3}",
            report.category,
            report.processed,
            report.emitted,
            report.restricted,
            report.skipped,
            report.files.len()
        );
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    let files: Vec<_> = summary.files().collect();
    if !files.is_empty() {
        println!(
            "📁 {} ({} file(s)):",
            if summary.dry_run { "Planned files" } else { "Files" },
            files.len()
        );
        for file in files {
            println!("  {}  {}", file.sha256, file.path.display());
        }
        println!();
    }

    let issues: Vec<_> = summary.issues().collect();
    if !issues.is_empty() {
        println!("⚠️  Issues ({}):", issues.len());
        for issue in issues.iter().take(20) {
            println!("  - {issue}");
        }
        if issues.len() > 20 {
            println!("  ... and {} more", issues.len() - 20);
        }
        println!();
    }

    match summary.health {
        Health::Ok => println!("✅ Export completed successfully!"),
        Health::Warn => println!("⚠️  Export completed with skipped entities"),
        Health::Fatal => println!(
            "❌ Export aborted: {}",
            summary.fatal_error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(Health::Ok), 0);
        assert_eq!(exit_code(Health::Warn), 1);
        assert_eq!(exit_code(Health::Fatal), 5);
    }

    #[tokio::test]
    async fn test_missing_config_is_config_error() {
        let args = ExportArgs::default();
        let code = args.execute("/nonexistent/gar-export.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }

    #[test]
    fn test_overrides() {
        let toml = r#"
            [input]
            structures = "structures.json"

            [index]
            kind = "file"
            path = "index.json"
            territory = "rennes"
        "#;
        let mut config: GarExportConfig = toml::from_str(toml).unwrap();
        let args = ExportArgs {
            dry_run: true,
            output_dir: Some("/tmp/gar".to_string()),
            nodes_per_file: Some(10),
        };

        args.apply_overrides(&mut config);
        assert!(config.application.dry_run);
        assert_eq!(config.output.directory, "/tmp/gar");
        assert_eq!(config.output.nodes_per_file, 10);
    }
}
