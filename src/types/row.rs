//! Row type for query results.

use std::sync::Arc;

use super::column::ColumnInfo;
use super::value::Value;
use crate::error::{Error, Result};

/// A row of query results.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values.
    values: Vec<Value>,
    /// Shared column information (reference counted).
    column_info: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with values and shared column info.
    pub fn new(values: Vec<Value>, column_info: Arc<ColumnInfo>) -> Self {
        Self {
            values,
            column_info,
        }
    }

    /// Get value by column index (0-based).
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.column_info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get value by column name, failing with `Error::ColumnNotFound`.
    pub fn try_get(&self, name: &str) -> Result<&Value> {
        self.get_by_name(name).ok_or_else(|| Error::ColumnNotFound {
            name: name.to_string(),
        })
    }

    /// Get a column's text with CHAR padding removed.
    ///
    /// Outfile tables written by DSPFD/DSPOBJD are fixed-width, so most
    /// values arrive blank padded.
    pub fn get_trimmed(&self, name: &str) -> Result<&str> {
        match self.try_get(name)? {
            Value::Text(s) | Value::Decimal(s) => Ok(s.trim_end()),
            other => Err(Error::type_conversion(format!(
                "column {} holds {:?}, not text",
                name, other
            ))),
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_info.column_names()
    }
}
