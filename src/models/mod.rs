//! Models module
//!
//! Data structures shared between configuration, cataloging and notification.

pub mod column;
pub mod data_type;
pub mod enums;
pub mod table;

pub use column::CatalogColumn;
pub use data_type::DataType;
pub use enums::{FileStatus, NotificationStatus, ReportLevel, TagKey, Topic};
pub use table::{CatalogPartition, CatalogTable, PARTITION_COLUMNS, StorageFormat};
