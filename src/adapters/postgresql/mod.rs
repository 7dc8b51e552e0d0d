//! PostgreSQL staging backend
//!
//! Stores staged teaching facts in two run-scoped tables so that large
//! exports do not have to hold every staff record in memory.

pub mod client;
pub mod store;

pub use client::PostgreSQLClient;
pub use store::PostgreSQLStagingStore;
