// GAR Export - School Directory to GAR Interchange Files
// Copyright (c) 2025 GAR Export Contributors
// Licensed under the MIT License

//! # GAR Export - School Directory to GAR Interchange Files
//!
//! GAR Export is a batch tool that turns school directory snapshots (pupils,
//! teachers, responsible parties, structures) into the XML interchange files
//! consumed by the GAR resource-access platform.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Reading** directory snapshots and an optional restriction document
//! - **Resolving** national profiles and validating codes against an external index
//! - **Staging** teaching facts gathered from people for the school and group passes
//! - **Writing** paginated, schema-checked XML files with a per-file digest
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (helper, validator, writer, builders, export)
//! - [`adapters`] - External integrations (snapshots, code index, staging store)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gar_export::config::load_config;
//! use gar_export::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("gar-export.toml")?;
//!
//!     let coordinator = ExportCoordinator::new(config).await?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     println!("Emitted {} entities ({})", summary.total_emitted(), summary.health);
//!     Ok(())
//! }
//! ```
//!
//! ## Run Health
//!
//! Every run ends with a [`domain::Health`]: `Ok` when nothing was skipped,
//! `Warn` when some entities were dropped for missing data, `Fatal` when the
//! run aborted. The CLI maps it to the process exit code.
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`], backed by [`domain::GarError`]:
//!
//! ```rust,no_run
//! use gar_export::domain::GarError;
//!
//! fn example() -> Result<(), GarError> {
//!     let config = gar_export::config::load_config("gar-export.toml")?;
//!     println!("{}", config.index.territory);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
