//! Physical data types declared in pipeline schemas

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::DataType as ArrowType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Precision used when a schema declares a bare `DECIMAL`
pub const DEFAULT_DECIMAL_PRECISION: u8 = 38;
/// Scale used when a schema declares a bare `DECIMAL`
pub const DEFAULT_DECIMAL_SCALE: i8 = 18;

static DECIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^DECIMAL\s*\(\s*(\d{1,2})\s*,\s*(\d{1,2})\s*\)$").expect("valid decimal pattern")
});

/// A column type as written in the pipeline configuration (`STRING`, `DECIMAL(3,2)`, ...)
///
/// Each type knows its catalog spelling and the Arrow type used when the
/// column is written to Parquet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal { precision: u8, scale: i8 },
    Boolean,
    Date,
    Timestamp,
}

impl DataType {
    /// Type name as registered in the data catalog
    pub fn catalog_type(&self) -> String {
        match self {
            DataType::String => "string".to_string(),
            DataType::TinyInt => "tinyint".to_string(),
            DataType::SmallInt => "smallint".to_string(),
            DataType::Int => "int".to_string(),
            DataType::BigInt => "bigint".to_string(),
            DataType::Float => "float".to_string(),
            DataType::Double => "double".to_string(),
            DataType::Decimal { precision, scale } => format!("decimal({},{})", precision, scale),
            DataType::Boolean => "boolean".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Timestamp => "timestamp".to_string(),
        }
    }

    /// Arrow type used for the Parquet column
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            DataType::String => ArrowType::Utf8,
            DataType::TinyInt => ArrowType::Int8,
            DataType::SmallInt => ArrowType::Int16,
            DataType::Int => ArrowType::Int32,
            DataType::BigInt => ArrowType::Int64,
            DataType::Float => ArrowType::Float32,
            DataType::Double => ArrowType::Float64,
            DataType::Decimal { precision, scale } => ArrowType::Decimal128(*precision, *scale),
            DataType::Boolean => ArrowType::Boolean,
            DataType::Date => ArrowType::Date32,
            DataType::Timestamp => {
                ArrowType::Timestamp(arrow::datatypes::TimeUnit::Microsecond, None)
            }
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let data_type = match upper.as_str() {
            "STRING" | "VARCHAR" | "TEXT" => DataType::String,
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" => DataType::SmallInt,
            "INT" | "INTEGER" => DataType::Int,
            "BIGINT" | "LONG" => DataType::BigInt,
            "FLOAT" => DataType::Float,
            "DOUBLE" => DataType::Double,
            "DECIMAL" => DataType::Decimal {
                precision: DEFAULT_DECIMAL_PRECISION,
                scale: DEFAULT_DECIMAL_SCALE,
            },
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "DATE" => DataType::Date,
            "TIMESTAMP" => DataType::Timestamp,
            other => {
                let captures = DECIMAL_PATTERN
                    .captures(other)
                    .ok_or_else(|| format!("Unsupported data type '{}'", s))?;
                let precision: u8 = captures[1]
                    .parse()
                    .map_err(|_| format!("Invalid decimal precision in '{}'", s))?;
                let scale: i8 = captures[2]
                    .parse()
                    .map_err(|_| format!("Invalid decimal scale in '{}'", s))?;
                if precision == 0 || precision > 38 || scale as u8 > precision {
                    return Err(format!("Invalid decimal precision/scale in '{}'", s));
                }
                DataType::Decimal { precision, scale }
            }
        };
        Ok(data_type)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Decimal { precision, scale } => write!(f, "DECIMAL({},{})", precision, scale),
            other => write!(f, "{}", other.catalog_type().to_uppercase()),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
