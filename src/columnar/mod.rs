//! Columnar publication of processed files
//!
//! [`ColumnarSerializer`] turns a [`Frame`] into columnar file bytes;
//! [`ParquetSerializer`] is the production implementation.
//! [`ColumnarWriter`] prepares the processed file for publication and stores
//! the serialized result under its partitioned key.

pub mod serializer;
pub mod writer;

use thiserror::Error;

use crate::frame::Frame;
use crate::models::CatalogColumn;

pub use serializer::{ParquetCompression, ParquetSerializer};
pub use writer::{ColumnarWriter, WriterError};

/// Errors raised while serializing a frame
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Column '{0}' has no declared type")]
    UndeclaredColumn(String),
}

/// Converts a frame into a columnar file
pub trait ColumnarSerializer: Send + Sync {
    /// Serialize `frame`; values are converted to the types of `schema`
    /// when given, otherwise types are inferred from the values
    fn write(&self, frame: &Frame, schema: Option<&[CatalogColumn]>) -> Result<Vec<u8>, SerializeError>;
}
