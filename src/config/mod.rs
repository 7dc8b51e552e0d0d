//! Configuration management
//!
//! TOML configuration with `${VAR_NAME}` substitution, `GAR_EXPORT_*`
//! environment overrides, defaults for optional settings and validation on
//! load.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gar_export::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("gar-export.toml")?;
//! println!("Territory: {}", config.index.territory);
//! println!("Output: {}", config.output.directory);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level, dry run
//! - [`InputConfig`] - snapshot files, restriction document, member structures
//! - [`IndexConfig`] - external code index connection and alias templates
//! - [`OutputConfig`] - output directory, file naming, envelope version, pagination
//! - [`StagingConfig`] - staging store backend
//! - [`AttributeConfig`] - attribute names per entity category
//! - [`ProfileConfig`] - extra national profile mapping rows
//! - [`LoggingConfig`] - logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [input]
//! structures = "data/structures.json"
//! pupils = "data/pupils.json"
//! teachers = "data/teachers.json"
//!
//! [index]
//! base_url = "https://search.example.org"
//! username = "gar"
//! password = "${GAR_EXPORT_INDEX_PASSWORD}"
//! territory = "rennes"
//!
//! [output]
//! directory = "/var/lib/gar-export"
//! nodes_per_file = 10000
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, AttributeConfig, GarExportConfig, IndexConfig, IndexKind, InputConfig,
    LoggingConfig, OutputConfig, PostgreSQLConfig, ProfileConfig, PupilAttributes,
    ResponsibleAttributes, RetryConfig, StagingBackend, StagingConfig, StructureAttributes,
    TeacherAttributes,
};
pub use secret::{secret_string, SecretString, SecretValue};
