//! Core business logic of the exporter.
//!
//! # Modules
//!
//! - [`helper`] - Profile mapping, contract codes, index aliases, file naming
//! - [`validator`] - Curriculum codes checked against the external index
//! - [`writer`] - Paginated schema-validating writer
//! - [`builders`] - One builder per output category, group reconciliation
//! - [`export`] - Pass orchestration, progress and summary
//!
//! # Export Workflow
//!
//! 1. **Load**: read the structures snapshot, derive the member structures
//! 2. **Person passes**: pupils then teachers, staging what they learn per school
//! 3. **Structure passes**: schools then groups, reading the staging store back
//! 4. **Responsible parties**
//! 5. **Report**: discard the staging store, produce the run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use gar_export::config::load_config;
//! use gar_export::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("gar-export.toml")?;
//! let coordinator = ExportCoordinator::new(config).await?;
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Health: {}", summary.health);
//! println!("Files: {}", summary.files().count());
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod export;
pub mod helper;
pub mod validator;
pub mod writer;
