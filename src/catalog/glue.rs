//! AWS Glue data catalog

use std::sync::Arc;

use aws_sdk_glue::Client as GlueClient;
use aws_sdk_glue::error::DisplayErrorContext;
use aws_sdk_glue::types::{Column, PartitionInput, SerDeInfo, StorageDescriptor, TableInput};
use tracing::{debug, info};

use super::{CatalogError, CatalogService};
use crate::aws::AwsContext;
use crate::models::{CatalogColumn, CatalogPartition, CatalogTable, StorageFormat};

pub struct GlueCatalog {
    context: Arc<AwsContext>,
    client: GlueClient,
}

fn service_error(action: &str, error: impl std::error::Error) -> CatalogError {
    CatalogError::Service(format!("Failed to {}: {}", action, DisplayErrorContext(error)))
}

fn build_error(error: impl std::fmt::Display) -> CatalogError {
    CatalogError::Service(format!("Invalid catalog definition: {}", error))
}

impl GlueCatalog {
    pub fn new(context: Arc<AwsContext>) -> Self {
        let client = GlueClient::new(context.sdk_config());
        Self { context, client }
    }

    fn glue_columns(columns: &[CatalogColumn]) -> Result<Vec<Column>, CatalogError> {
        columns
            .iter()
            .map(|c| {
                Column::builder()
                    .name(&c.name)
                    .r#type(c.catalog_type())
                    .build()
                    .map_err(build_error)
            })
            .collect()
    }

    fn storage_descriptor(
        columns: Option<Vec<Column>>,
        location: &str,
        format: StorageFormat,
    ) -> StorageDescriptor {
        StorageDescriptor::builder()
            .set_columns(columns)
            .location(location)
            .input_format(format.input_format())
            .output_format(format.output_format())
            .serde_info(
                SerDeInfo::builder()
                    .serialization_library(format.serde_library())
                    .build(),
            )
            .build()
    }

    fn table_input(table: &CatalogTable) -> Result<TableInput, CatalogError> {
        TableInput::builder()
            .name(&table.name)
            .description(&table.description)
            .table_type("EXTERNAL_TABLE")
            .parameters("classification", "parquet")
            .storage_descriptor(Self::storage_descriptor(
                Some(Self::glue_columns(&table.columns)?),
                &table.location,
                table.format,
            ))
            .set_partition_keys(Some(Self::glue_columns(&table.partition_columns)?))
            .build()
            .map_err(build_error)
    }

    fn table_exists(&self, database: &str, table: &str) -> Result<bool, CatalogError> {
        let result = self.context.block_on(
            self.client
                .get_table()
                .database_name(database)
                .name(table)
                .send(),
        );
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_entity_not_found_exception()) => {
                Ok(false)
            }
            Err(e) => Err(service_error("read table", e)),
        }
    }
}

impl CatalogService for GlueCatalog {
    fn sync_table_definition(&self, database: &str, table: &CatalogTable) -> Result<(), CatalogError> {
        let input = Self::table_input(table)?;
        if self.table_exists(database, &table.name)? {
            self.context
                .block_on(
                    self.client
                        .update_table()
                        .database_name(database)
                        .table_input(input)
                        .send(),
                )
                .map_err(|e| service_error("update table", e))?;
            debug!(database, table = %table.name, "Updated Glue table");
        } else {
            self.context
                .block_on(
                    self.client
                        .create_table()
                        .database_name(database)
                        .table_input(input)
                        .send(),
                )
                .map_err(|e| service_error("create table", e))?;
            info!(database, table = %table.name, "Created Glue table");
        }
        Ok(())
    }

    fn add_table_partition(
        &self,
        database: &str,
        table: &str,
        partition: &CatalogPartition,
    ) -> Result<(), CatalogError> {
        let input = PartitionInput::builder()
            .set_values(Some(partition.values.clone()))
            .storage_descriptor(Self::storage_descriptor(
                None,
                &partition.location,
                StorageFormat::Parquet,
            ))
            .build();

        let result = self.context.block_on(
            self.client
                .create_partition()
                .database_name(database)
                .table_name(table)
                .partition_input(input)
                .send(),
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_already_exists_exception()) => {
                debug!(database, table, values = ?partition.values, "Partition already registered");
                Ok(())
            }
            Err(e) => Err(service_error("create partition", e)),
        }
    }

    fn is_table_needing_updating_schema(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
        partition_values: &[String],
    ) -> Result<bool, CatalogError> {
        let result = self.context.block_on(
            self.client
                .get_table()
                .database_name(database)
                .name(table)
                .send(),
        );
        let response = match result {
            Ok(response) => response,
            Err(e) if e.as_service_error().is_some_and(|s| s.is_entity_not_found_exception()) => {
                return Ok(true);
            }
            Err(e) => return Err(service_error("read table", e)),
        };

        let registered: Vec<&str> = response
            .table()
            .and_then(|t| t.storage_descriptor())
            .map(|sd| sd.columns().iter().map(|c| c.name()).collect())
            .unwrap_or_default();
        if columns.iter().any(|c| !registered.contains(&c.as_str())) {
            return Ok(true);
        }

        let result = self.context.block_on(
            self.client
                .get_partition()
                .database_name(database)
                .table_name(table)
                .set_partition_values(Some(partition_values.to_vec()))
                .send(),
        );
        match result {
            Ok(_) => Ok(false),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_entity_not_found_exception()) => {
                Ok(true)
            }
            Err(e) => Err(service_error("read partition", e)),
        }
    }

    fn start_crawler(&self, name: &str) -> Result<(), CatalogError> {
        let result = self
            .context
            .block_on(self.client.start_crawler().name(name).send());
        match result {
            Ok(_) => {
                info!(crawler = name, "Started crawler");
                Ok(())
            }
            Err(e) if e.as_service_error().is_some_and(|s| s.is_crawler_running_exception()) => {
                debug!(crawler = name, "Crawler already running");
                Ok(())
            }
            Err(e) if e.as_service_error().is_some_and(|s| s.is_entity_not_found_exception()) => {
                Err(CatalogError::CrawlerNotFound(name.to_string()))
            }
            Err(e) => Err(service_error("start crawler", e)),
        }
    }
}
