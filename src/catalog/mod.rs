//! Data catalog registration
//!
//! [`CatalogService`] is the contract with the catalog backend (tables,
//! partitions, drift detection, crawlers). [`CatalogSync`] builds the table
//! and partition definitions of a published file and registers them.

#[cfg(feature = "aws")]
pub mod glue;
pub mod memory;
pub mod sync;

use thiserror::Error;

use crate::models::{CatalogPartition, CatalogTable};
use crate::paths::PathError;

#[cfg(feature = "aws")]
pub use glue::GlueCatalog;
pub use memory::InMemoryCatalog;
pub use sync::CatalogSync;

/// Errors raised by catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("Table '{database}.{table}' not found")]
    TableNotFound { database: String, table: String },

    #[error("Crawler '{0}' not found")]
    CrawlerNotFound(String),

    #[error("Catalog service error: {0}")]
    Service(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Catalog backend
pub trait CatalogService: Send + Sync {
    /// Create the table, or replace the definition of an existing one
    fn sync_table_definition(&self, database: &str, table: &CatalogTable) -> Result<(), CatalogError>;

    /// Register a partition; registering an existing partition is a no-op
    fn add_table_partition(
        &self,
        database: &str,
        table: &str,
        partition: &CatalogPartition,
    ) -> Result<(), CatalogError>;

    /// Whether the registered table lacks these columns or this partition
    ///
    /// A table that does not exist yet needs updating.
    fn is_table_needing_updating_schema(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
        partition_values: &[String],
    ) -> Result<bool, CatalogError>;

    /// Start a crawler run; a crawler that is already running is left alone
    fn start_crawler(&self, name: &str) -> Result<(), CatalogError>;
}
