use std::sync::Arc;

use tracing::{debug, info};

use super::{CatalogError, CatalogService};
use crate::config::Config;
use crate::models::{CatalogPartition, CatalogTable};
use crate::paths;

/// Registers published files with the catalog
pub struct CatalogSync {
    service: Arc<dyn CatalogService>,
    database: String,
}

impl CatalogSync {
    pub fn new(service: Arc<dyn CatalogService>, database: impl Into<String>) -> Self {
        Self {
            service,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table definition of a pipeline's published dataset
    pub fn table_definition(bucket: &str, key: &str, pipeline_name: &str, config: &Config) -> CatalogTable {
        CatalogTable::new(
            pipeline_name,
            config.published_columns(),
            paths::parquet_table_location(bucket, key),
        )
    }

    /// Partition holding the columnar copy of `key`
    pub fn partition(bucket: &str, key: &str, config: &Config) -> Result<CatalogPartition, CatalogError> {
        let format = &config.file_name_timestamp;
        Ok(CatalogPartition {
            values: paths::partition_values(key, format)?.to_vec(),
            location: paths::parquet_partition_location(bucket, key, format)?,
        })
    }

    /// Register the table, then the partition of this file
    pub fn sync(
        &self,
        bucket: &str,
        key: &str,
        pipeline_name: &str,
        config: &Config,
    ) -> Result<CatalogTable, CatalogError> {
        let table = Self::table_definition(bucket, key, pipeline_name, config);
        let partition = Self::partition(bucket, key, config)?;

        self.service.sync_table_definition(&self.database, &table)?;
        debug!(database = %self.database, table = %table.name, columns = table.columns.len(), "Synced table definition");

        self.service
            .add_table_partition(&self.database, &table.name, &partition)?;
        info!(
            database = %self.database,
            table = %table.name,
            partition = ?partition.values,
            location = %partition.location,
            "Registered partition"
        );
        Ok(table)
    }

    pub fn needs_schema_update(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
        partition_values: &[String],
    ) -> Result<bool, CatalogError> {
        self.service
            .is_table_needing_updating_schema(database, table, columns, partition_values)
    }

    pub fn start_crawler(&self, name: &str) -> Result<(), CatalogError> {
        self.service.start_crawler(name)
    }
}
