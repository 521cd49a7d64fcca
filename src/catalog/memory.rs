//! In-process catalog

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{CatalogError, CatalogService};
use crate::models::{CatalogPartition, CatalogTable};

#[derive(Debug, Default)]
struct State {
    databases: BTreeSet<String>,
    tables: BTreeMap<(String, String), CatalogTable>,
    partitions: BTreeMap<(String, String), Vec<CatalogPartition>>,
    crawlers: BTreeSet<String>,
    crawler_runs: Vec<String>,
    failing: Option<String>,
}

/// Catalog kept in memory, for tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: Mutex<State>,
}

impl InMemoryCatalog {
    /// Catalog with the given databases and crawlers
    pub fn new<D, C>(databases: D, crawlers: C) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let catalog = Self::default();
        {
            let mut state = catalog.lock();
            state.databases = databases.into_iter().map(Into::into).collect();
            state.crawlers = crawlers.into_iter().map(Into::into).collect();
        }
        catalog
    }

    /// Make every table and partition registration fail with `message`
    pub fn fail_registrations(&self, message: impl Into<String>) {
        self.lock().failing = Some(message.into());
    }

    pub fn table(&self, database: &str, name: &str) -> Option<CatalogTable> {
        self.lock()
            .tables
            .get(&(database.to_string(), name.to_string()))
            .cloned()
    }

    pub fn partitions(&self, database: &str, table: &str) -> Vec<CatalogPartition> {
        self.lock()
            .partitions
            .get(&(database.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Names of crawlers started so far, in start order
    pub fn crawler_runs(&self) -> Vec<String> {
        self.lock().crawler_runs.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(state: &State, database: &str) -> Result<(), CatalogError> {
        if let Some(message) = &state.failing {
            return Err(CatalogError::Service(message.clone()));
        }
        if !state.databases.contains(database) {
            return Err(CatalogError::DatabaseNotFound(database.to_string()));
        }
        Ok(())
    }
}

impl CatalogService for InMemoryCatalog {
    fn sync_table_definition(&self, database: &str, table: &CatalogTable) -> Result<(), CatalogError> {
        let mut state = self.lock();
        Self::check_writable(&state, database)?;
        state
            .tables
            .insert((database.to_string(), table.name.clone()), table.clone());
        Ok(())
    }

    fn add_table_partition(
        &self,
        database: &str,
        table: &str,
        partition: &CatalogPartition,
    ) -> Result<(), CatalogError> {
        let mut state = self.lock();
        Self::check_writable(&state, database)?;
        let key = (database.to_string(), table.to_string());
        if !state.tables.contains_key(&key) {
            return Err(CatalogError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            });
        }
        let partitions = state.partitions.entry(key).or_default();
        if !partitions.iter().any(|p| p.values == partition.values) {
            partitions.push(partition.clone());
        }
        Ok(())
    }

    fn is_table_needing_updating_schema(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
        partition_values: &[String],
    ) -> Result<bool, CatalogError> {
        let state = self.lock();
        let key = (database.to_string(), table.to_string());
        let Some(registered) = state.tables.get(&key) else {
            return Ok(true);
        };

        let known: BTreeSet<&str> = registered.column_names().into_iter().collect();
        if columns.iter().any(|c| !known.contains(c.as_str())) {
            return Ok(true);
        }

        let has_partition = state
            .partitions
            .get(&key)
            .is_some_and(|parts| parts.iter().any(|p| p.values == partition_values));
        Ok(!has_partition)
    }

    fn start_crawler(&self, name: &str) -> Result<(), CatalogError> {
        let mut state = self.lock();
        if !state.crawlers.contains(name) {
            return Err(CatalogError::CrawlerNotFound(name.to_string()));
        }
        state.crawler_runs.push(name.to_string());
        Ok(())
    }
}
