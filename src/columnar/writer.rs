//! Publication of a processed file as partitioned Parquet

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::{ColumnarSerializer, SerializeError};
use crate::config::{
    AS_OF_DATE_COLUMN, CONFIDENCE_LEVEL_COLUMN, CORRELATION_ID_COLUMN, Config, ROW_INDEX_COLUMN,
    sanitize_column_name,
};
use crate::frame::extend::ColumnNaming;
use crate::frame::{Frame, FrameError, with_as_of_date, with_error_columns};
use crate::paths::{self, PathError};
use crate::storage::{FileLocation, ObjectStore, StorageError};

/// Calculated columns the writer knows how to fill
const DERIVED_COLUMNS: [&str; 4] = [
    AS_OF_DATE_COLUMN,
    ROW_INDEX_COLUMN,
    CORRELATION_ID_COLUMN,
    CONFIDENCE_LEVEL_COLUMN,
];

/// Errors raised while publishing a file
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Calculated column '{0}' cannot be derived")]
    UnknownCalculatedColumn(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Writes the published copy of a processed file
pub struct ColumnarWriter {
    store: Arc<dyn ObjectStore>,
    serializer: Arc<dyn ColumnarSerializer>,
}

impl ColumnarWriter {
    pub fn new(store: Arc<dyn ObjectStore>, serializer: Arc<dyn ColumnarSerializer>) -> Self {
        Self { store, serializer }
    }

    /// Publish the file at `target_key` and return the key of the columnar copy
    ///
    /// Rows listed in `error_rows` get a confidence level of 0.
    pub fn create(
        &self,
        target_bucket: &str,
        target_key: &str,
        config: &Config,
        error_rows: &[usize],
        correlation_id: &str,
    ) -> Result<String, WriterError> {
        let key = paths::parquet_key(target_key, &config.file_name_timestamp)?;

        let source = self
            .store
            .open_object(&FileLocation::new(target_bucket, target_key))?;
        let raw = Frame::read_csv(source, config.delimiter)?;
        let frame = Self::prepare(&raw, config, target_key, error_rows, correlation_id)?;

        let columns = config.published_columns();
        let bytes = self.serializer.write(&frame, Some(&columns))?;
        self.store.put_object(target_bucket, &key, &bytes)?;

        info!(
            bucket = target_bucket,
            key = %key,
            rows = frame.len(),
            columns = frame.columns().len(),
            flagged_rows = error_rows.len(),
            "Wrote columnar copy"
        );
        Ok(key)
    }

    /// Shape a raw file frame into the published column set
    pub fn prepare(
        raw: &Frame,
        config: &Config,
        file_key: &str,
        error_rows: &[usize],
        correlation_id: &str,
    ) -> Result<Frame, WriterError> {
        if let Some(column) = config
            .filtered_schema(true)
            .into_iter()
            .find(|c| c.is_calculated && !DERIVED_COLUMNS.contains(&c.name.as_str()))
        {
            return Err(WriterError::UnknownCalculatedColumn(column.name.clone()));
        }

        let frame = if config.sanitize_columns {
            raw.rename_columns(sanitize_column_name)?
        } else {
            raw.clone()
        };

        let file_columns: Vec<&str> = config
            .filtered_schema(false)
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        let frame = frame.select(&file_columns)?;

        let file_date = paths::embedded_timestamp(file_key, &config.file_name_timestamp)?.date();
        let frame = with_as_of_date(&frame, config, ColumnNaming::Logical, file_date)?;

        let frame = if config.error_reporting_enabled {
            with_error_columns(&frame, error_rows, correlation_id, config)?
        } else {
            frame
        };

        let published: Vec<String> = config
            .published_columns()
            .into_iter()
            .map(|c| c.name)
            .collect();
        Ok(frame.select(&published)?)
    }
}
