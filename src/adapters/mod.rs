//! External system integrations for the GAR export.
//!
//! - [`source`] - input snapshots and the external code index (HTTP or file)
//! - [`restriction`] - optional join-key allow-list
//! - [`staging`] - run-scoped staging store abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL staging backend
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the builders can
//! be tested against in-memory implementations.
//!
//! ```rust,no_run
//! use gar_export::adapters::source::{SearchRequest, SearchSource, HttpIndexSource};
//! use gar_export::config::IndexConfig;
//!
//! # async fn example(config: IndexConfig) -> gar_export::domain::Result<()> {
//! let index = HttpIndexSource::new(&config)?;
//! let response = index
//!     .search(&SearchRequest::exact("rennes-matiere", "identifiant", "030100"))
//!     .await?;
//! println!("{}", response["hits"]["total"]);
//! # Ok(())
//! # }
//! ```

pub mod postgresql;
pub mod restriction;
pub mod source;
pub mod staging;
