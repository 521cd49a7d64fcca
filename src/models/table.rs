//! Catalog table and partition model

use serde::{Deserialize, Serialize};

use super::column::CatalogColumn;

/// Partition columns shared by every published dataset
pub const PARTITION_COLUMNS: [&str; 3] = ["year", "year_month", "year_month_day"];

/// Storage format of a catalog table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    #[default]
    Parquet,
}

impl StorageFormat {
    pub fn input_format(&self) -> &'static str {
        match self {
            StorageFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat"
            }
        }
    }

    pub fn output_format(&self) -> &'static str {
        match self {
            StorageFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat"
            }
        }
    }

    pub fn serde_library(&self) -> &'static str {
        match self {
            StorageFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe"
            }
        }
    }
}

/// Table definition registered with the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogTable {
    pub name: String,
    pub columns: Vec<CatalogColumn>,
    pub partition_columns: Vec<CatalogColumn>,
    /// Storage root, e.g. `s3://curated/CFM/Everest/Holdings/parquet/`
    pub location: String,
    #[serde(default)]
    pub format: StorageFormat,
    #[serde(default)]
    pub description: String,
}

impl CatalogTable {
    /// Create a table partitioned by year / year_month / year_month_day
    pub fn new(name: impl Into<String>, columns: Vec<CatalogColumn>, location: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            columns,
            partition_columns: PARTITION_COLUMNS
                .iter()
                .map(|c| CatalogColumn::partition(*c))
                .collect(),
            location: location.into(),
            format: StorageFormat::Parquet,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// One registered partition of a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogPartition {
    pub values: Vec<String>,
    pub location: String,
}
