//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{GarExportConfig, IndexKind, StagingBackend};
use super::secret::secret_string;
use crate::domain::errors::GarError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GarExportConfig
/// 4. Applies environment variable overrides (GAR_EXPORT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use gar_export::config::loader::load_config;
///
/// let config = load_config("gar-export.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GarExportConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GarError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        GarError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: GarExportConfig = toml::from_str(&contents)
        .map_err(|e| GarError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        GarError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| GarError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(GarError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the GAR_EXPORT_* prefix
///
/// Environment variables follow the pattern: GAR_EXPORT_<SECTION>_<KEY>
/// For example: GAR_EXPORT_INDEX_BASE_URL, GAR_EXPORT_OUTPUT_DIRECTORY
fn apply_env_overrides(config: &mut GarExportConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("GAR_EXPORT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Input overrides
    if let Ok(val) = std::env::var("GAR_EXPORT_INPUT_STRUCTURES") {
        config.input.structures = val;
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INPUT_PUPILS") {
        config.input.pupils = Some(val);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INPUT_TEACHERS") {
        config.input.teachers = Some(val);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INPUT_RESPONSIBLES") {
        config.input.responsibles = Some(val);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INPUT_RESTRICTION") {
        config.input.restriction = Some(val);
    }

    // Index overrides
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_KIND") {
        config.index.kind = match val.to_lowercase().as_str() {
            "http" => IndexKind::Http,
            "file" => IndexKind::File,
            other => {
                return Err(GarError::Configuration(format!(
                    "Invalid GAR_EXPORT_INDEX_KIND '{other}'. Must be one of: http, file"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_BASE_URL") {
        config.index.base_url = Some(val);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_PATH") {
        config.index.path = Some(val);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_USERNAME") {
        config.index.username = Some(val);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_PASSWORD") {
        config.index.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_TERRITORY") {
        config.index.territory = val;
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_INDEX_MAX_CONCURRENT_QUERIES") {
        if let Ok(limit) = val.parse() {
            config.index.max_concurrent_queries = limit;
        }
    }

    // Output overrides
    if let Ok(val) = std::env::var("GAR_EXPORT_OUTPUT_DIRECTORY") {
        config.output.directory = val;
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_OUTPUT_VERSION") {
        config.output.version = val;
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_OUTPUT_NODES_PER_FILE") {
        if let Ok(nodes) = val.parse() {
            config.output.nodes_per_file = nodes;
        }
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_OUTPUT_ENTRIES_PER_PAGE") {
        if let Ok(entries) = val.parse() {
            config.output.entries_per_page = entries;
        }
    }

    // Staging overrides
    if let Ok(val) = std::env::var("GAR_EXPORT_STAGING_BACKEND") {
        config.staging.backend = match val.to_lowercase().as_str() {
            "memory" => StagingBackend::Memory,
            "postgresql" => StagingBackend::PostgreSQL,
            other => {
                return Err(GarError::Configuration(format!(
                    "Invalid GAR_EXPORT_STAGING_BACKEND '{other}'. Must be one of: memory, postgresql"
                )))
            }
        };
    }
    if let Some(ref mut pg_config) = config.staging.postgresql {
        if let Ok(val) = std::env::var("GAR_EXPORT_STAGING_PG_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("GAR_EXPORT_STAGING_PG_TABLE_PREFIX") {
            pg_config.table_prefix = val;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("GAR_EXPORT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("GAR_EXPORT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
