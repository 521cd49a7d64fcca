//! Catalog column model

use serde::{Deserialize, Serialize};

use super::data_type::DataType;

/// A column as registered in the data catalog
///
/// The name is the one written to Parquet: the sanitized schema key when
/// column sanitization is enabled, otherwise the name as it appears in the file.
///
/// # Example
///
/// ```rust
/// use file_ingest_pipeline::models::{CatalogColumn, DataType};
///
/// let column = CatalogColumn::new("portfolio_id", DataType::Int);
/// assert_eq!(column.catalog_type(), "int");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogColumn {
    /// Column name
    pub name: String,
    /// Physical type
    pub data_type: DataType,
}

impl CatalogColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Partition column (always typed as string)
    pub fn partition(name: impl Into<String>) -> Self {
        Self::new(name, DataType::String)
    }

    pub fn catalog_type(&self) -> String {
        self.data_type.catalog_type()
    }
}
