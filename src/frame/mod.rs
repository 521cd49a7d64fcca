//! Tabular data held in memory
//!
//! A [`Frame`] is a small row-oriented table of JSON values. Delimited files
//! are read into frames, extended with derived columns and handed to the
//! quality engine and the columnar serializer. Operations that change the
//! column set return a new frame; callers' frames are never modified.

pub mod extend;

use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use extend::{
    with_as_of_date, with_as_of_date_from_column, with_as_of_date_from_timestamp,
    with_error_columns,
};

/// Errors raised by frame operations
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to read delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column '{column}' not found, available columns: {}", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// Named columns and rows of JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Unchecked wire form of a [`Frame`]
#[derive(Deserialize)]
struct RawFrame {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = FrameError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        Frame::from_rows(raw.columns, raw.rows)
    }
}

impl Frame {
    /// Create an empty frame with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a frame, checking every row has one value per column
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Read a delimited file with a header row
    ///
    /// Cells are kept as strings; empty cells become nulls.
    pub fn read_csv<R: Read>(reader: R, delimiter: u8) -> Result<Self, FrameError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut frame = Self::new(columns);

        for record in csv_reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        Value::Null
                    } else {
                        Value::String(cell.to_string())
                    }
                })
                .collect();
            frame.push_row(row)?;
        }

        Ok(frame)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, FrameError> {
        let index = self.require(name)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), FrameError> {
        if row.len() != self.columns.len() {
            return Err(FrameError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Rename every column with `rename`
    pub fn rename_columns<F>(&self, rename: F) -> Result<Self, FrameError>
    where
        F: Fn(&str) -> String,
    {
        let mut columns: Vec<String> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let renamed = rename(column);
            if columns.contains(&renamed) {
                return Err(FrameError::DuplicateColumn(renamed));
            }
            columns.push(renamed);
        }
        Ok(Self {
            columns,
            rows: self.rows.clone(),
        })
    }

    pub fn rename_column(&self, from: &str, to: &str) -> Result<Self, FrameError> {
        self.require(from)?;
        self.rename_columns(|c| if c == from { to.to_string() } else { c.to_string() })
    }

    /// Frame without `name`; unchanged when the column does not exist
    pub fn drop_column(&self, name: &str) -> Self {
        let Some(index) = self.column_index(name) else {
            return self.clone();
        };
        let mut frame = self.clone();
        frame.columns.remove(index);
        for row in &mut frame.rows {
            row.remove(index);
        }
        frame
    }

    /// Frame with a new column at `position`, clamped to the frame width
    ///
    /// `values` yields one value per row, given the row position.
    pub fn insert_column<F>(&self, position: usize, name: &str, values: F) -> Result<Self, FrameError>
    where
        F: Fn(usize) -> Value,
    {
        if self.has_column(name) {
            return Err(FrameError::DuplicateColumn(name.to_string()));
        }
        let position = position.min(self.columns.len());
        let mut frame = self.clone();
        frame.columns.insert(position, name.to_string());
        for (index, row) in frame.rows.iter_mut().enumerate() {
            row.insert(position, values(index));
        }
        Ok(frame)
    }

    /// Frame restricted to `names`, in that order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, FrameError> {
        let indexes = names
            .iter()
            .map(|name| self.require(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Stack frames vertically over the union of their columns
    ///
    /// Columns keep first-seen order; values a frame lacks are null.
    pub fn concat<'a, I>(frames: I) -> Self
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let frames: Vec<&Frame> = frames.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        for frame in &frames {
            for column in &frame.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for frame in &frames {
            let indexes: Vec<Option<usize>> =
                columns.iter().map(|c| frame.column_index(c)).collect();
            for row in &frame.rows {
                rows.push(
                    indexes
                        .iter()
                        .map(|index| index.map_or(Value::Null, |i| row[i].clone()))
                        .collect(),
                );
            }
        }

        Self { columns, rows }
    }

    fn require(&self, name: &str) -> Result<usize, FrameError> {
        self.column_index(name)
            .ok_or_else(|| FrameError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }
}
