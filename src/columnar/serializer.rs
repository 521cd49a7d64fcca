//! Parquet serialization of frames
//!
//! Every column is first built as a string array and then cast to its target
//! Arrow type, so values are parsed exactly once and unparsable values fail
//! the whole write instead of turning into nulls.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType as ArrowType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;

use super::{ColumnarSerializer, SerializeError};
use crate::frame::Frame;
use crate::models::CatalogColumn;

/// Compression codec of written files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
}

impl ParquetCompression {
    fn codec(&self) -> Compression {
        match self {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
        }
    }
}

/// Writes frames as single row group Parquet files
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetSerializer {
    pub compression: ParquetCompression,
}

impl ParquetSerializer {
    pub fn new(compression: ParquetCompression) -> Self {
        Self { compression }
    }

    fn arrow_schema(frame: &Frame, schema: Option<&[CatalogColumn]>) -> Result<Schema, SerializeError> {
        let fields = frame
            .columns()
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let data_type = match schema {
                    Some(columns) => columns
                        .iter()
                        .find(|c| &c.name == name)
                        .map(|c| c.data_type.arrow_type())
                        .ok_or_else(|| SerializeError::UndeclaredColumn(name.clone()))?,
                    None => infer_type(frame.rows().iter().map(|row| &row[index])),
                };
                Ok(Field::new(name, data_type, true))
            })
            .collect::<Result<Vec<_>, SerializeError>>()?;
        Ok(Schema::new(fields))
    }
}

impl ColumnarSerializer for ParquetSerializer {
    fn write(&self, frame: &Frame, schema: Option<&[CatalogColumn]>) -> Result<Vec<u8>, SerializeError> {
        let schema = Arc::new(Self::arrow_schema(frame, schema)?);

        let arrays = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let values: Vec<Option<String>> =
                    frame.rows().iter().map(|row| cell_text(&row[index])).collect();
                to_array(values, field.data_type())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let props = WriterProperties::builder()
            .set_compression(self.compression.codec())
            .build();
        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(buffer)
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn to_array(values: Vec<Option<String>>, data_type: &ArrowType) -> Result<ArrayRef, SerializeError> {
    let strings: ArrayRef = Arc::new(StringArray::from(values));
    if data_type == &ArrowType::Utf8 {
        return Ok(strings);
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(strings.as_ref(), data_type, &options)?)
}

/// Narrowest of boolean, integer, float and string that holds every value
fn infer_type<'a, I>(values: I) -> ArrowType
where
    I: Iterator<Item = &'a Value>,
{
    let mut seen = false;
    let (mut booleans, mut integers, mut numbers) = (true, true, true);
    for value in values {
        match value {
            Value::Null => continue,
            Value::Bool(_) => {
                integers = false;
                numbers = false;
            }
            Value::Number(n) => {
                booleans = false;
                integers &= n.is_i64() || n.is_u64();
            }
            _ => return ArrowType::Utf8,
        }
        seen = true;
    }

    match (seen, booleans, integers, numbers) {
        (false, ..) => ArrowType::Utf8,
        (true, true, _, _) => ArrowType::Boolean,
        (true, false, true, true) => ArrowType::Int64,
        (true, false, false, true) => ArrowType::Float64,
        _ => ArrowType::Utf8,
    }
}
