//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the exporter configuration file.

use crate::cli::{EXIT_CONFIG, EXIT_OK};
use crate::config::{load_config, IndexKind, StagingBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates; the summary is printed on success.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Structures: {}", config.input.structures);
        println!("  Pupils: {}", config.input.pupils.as_deref().unwrap_or("-"));
        println!("  Teachers: {}", config.input.teachers.as_deref().unwrap_or("-"));
        println!(
            "  Responsibles: {}",
            config.input.responsibles.as_deref().unwrap_or("-")
        );
        println!(
            "  Restriction: {}",
            config.input.restriction.as_deref().unwrap_or("-")
        );

        match config.index.kind {
            IndexKind::Http => println!(
                "  Code Index: {} (http)",
                config.index.base_url.as_deref().unwrap_or_default()
            ),
            IndexKind::File => println!(
                "  Code Index: {} (file)",
                config.index.path.as_deref().unwrap_or_default()
            ),
        }
        println!("  Territory: {}", config.index.territory);

        match (&config.staging.backend, &config.staging.postgresql) {
            (StagingBackend::PostgreSQL, Some(pg_config)) => {
                use secrecy::ExposeSecret;
                println!("  Staging: PostgreSQL");
                println!(
                    "  PostgreSQL Connection: {}",
                    pg_config
                        .connection_string
                        .expose_secret()
                        .as_str()
                        .split('@')
                        .next_back()
                        .unwrap_or("***")
                );
                println!("  Table Prefix: {}", pg_config.table_prefix);
            }
            _ => println!("  Staging: memory"),
        }

        println!("  Output Directory: {}", config.output.directory);
        println!("  Envelope Version: {}", config.output.version);
        println!("  Nodes Per File: {}", config.output.nodes_per_file);
        println!();
        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[input]
structures = "structures.json"

[index]
kind = "file"
path = "index.json"
territory = "rennes"
"#
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_validate_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[input]
structures = "structures.json"

[index]
kind = "http"
territory = "rennes"
"#
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
