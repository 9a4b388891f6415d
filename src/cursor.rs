//! Lazy, forward-only iteration over result rows.
//!
//! A [`RowCursor`] wraps one driver result set. Rows are fetched from the
//! driver only as the caller pulls them, and the underlying statement is
//! released exactly once: when the rows run out, when fetching fails, when
//! [`RowCursor::close`] is called, or when the cursor is dropped early.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver::ResultSet;
use crate::error::{DriverError, Error, Result};
use crate::types::{Column, ColumnInfo, Row};

/// Which channel produced the rows; decides how fetch errors are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorSource {
    Query,
    Command,
}

/// Row-by-row cursor over a result set.
///
/// Borrows the connection it came from, so the connection cannot be closed
/// while rows are still being read.
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "odbc")]
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use iseries_rs::Connection;
///
/// let conn = Connection::connect("as400.local", "jdoe", "secret", "MYLIB")?;
/// for row in conn.query("SELECT CUSNO, CUSNAM FROM CUSTMAST", &[])? {
///     let row = row?;
///     println!("{:?}", row.values());
/// }
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "odbc"))]
/// # fn main() {}
/// ```
pub struct RowCursor<'conn> {
    /// Driver result set; `None` once released.
    result_set: Option<Box<dyn ResultSet + 'conn>>,
    /// Column metadata shared with every row.
    column_info: Arc<ColumnInfo>,
    /// Statement or CL command text, for error context.
    statement: String,
    source: CursorSource,
    /// Total rows fetched so far.
    rows_fetched: u64,
}

impl<'conn> RowCursor<'conn> {
    pub(crate) fn new(
        result_set: Box<dyn ResultSet + 'conn>,
        statement: impl Into<String>,
        source: CursorSource,
    ) -> Self {
        let column_info = Arc::new(ColumnInfo::new(result_set.columns().to_vec()));
        Self {
            result_set: Some(result_set),
            column_info,
            statement: statement.into(),
            source,
            rows_fetched: 0,
        }
    }

    /// A cursor over no rows, for statements without a result set.
    pub(crate) fn empty(statement: impl Into<String>) -> Self {
        Self {
            result_set: None,
            column_info: Arc::new(ColumnInfo::default()),
            statement: statement.into(),
            source: CursorSource::Query,
            rows_fetched: 0,
        }
    }

    /// Get column metadata.
    pub fn columns(&self) -> &[Column] {
        &self.column_info.columns
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_info.column_names()
    }

    /// Get the number of columns.
    pub fn num_columns(&self) -> usize {
        self.column_info.len()
    }

    /// Number of rows fetched so far.
    pub fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    /// Check if the underlying statement has been released.
    pub fn is_closed(&self) -> bool {
        self.result_set.is_none()
    }

    /// Release the underlying statement without reading the remaining rows.
    pub fn close(&mut self) -> Result<()> {
        match self.result_set.take() {
            Some(mut result_set) => result_set.close().map_err(|e| self.wrap(e)),
            None => Ok(()),
        }
    }

    /// Read all remaining rows into a vector.
    pub fn fetch_all(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for row in &mut self {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn release(&mut self) {
        if let Some(mut result_set) = self.result_set.take() {
            debug!(rows = self.rows_fetched, "Releasing cursor");
            if let Err(e) = result_set.close() {
                warn!(error = %e, "Error while releasing cursor");
            }
        }
    }

    fn wrap(&self, source: DriverError) -> Error {
        match self.source {
            CursorSource::Query => Error::Query {
                statement: self.statement.clone(),
                source,
            },
            CursorSource::Command => Error::Command {
                command: self.statement.clone(),
                source,
            },
        }
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let fetched = self.result_set.as_mut()?.next_row();
        match fetched {
            Ok(Some(values)) => {
                self.rows_fetched += 1;
                Some(Ok(Row::new(values, Arc::clone(&self.column_info))))
            }
            Ok(None) => {
                self.release();
                None
            }
            Err(e) => {
                self.release();
                Some(Err(self.wrap(e)))
            }
        }
    }
}

impl FusedIterator for RowCursor<'_> {}

impl Drop for RowCursor<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for RowCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("statement", &self.statement)
            .field("columns", &self.column_info.column_names())
            .field("rows_fetched", &self.rows_fetched)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverResult;
    use crate::types::{SqlType, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Result set yielding `rows` integers, then optionally failing.
    struct Counting {
        columns: Vec<Column>,
        remaining: u32,
        fail_at_end: bool,
        closes: Rc<Cell<u32>>,
    }

    impl ResultSet for Counting {
        fn columns(&self) -> &[Column] {
            &self.columns
        }

        fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>> {
            if self.remaining == 0 {
                if self.fail_at_end {
                    return Err(DriverError::with_state("HY000", "fetch failed"));
                }
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(vec![Value::Integer(self.remaining.into())]))
        }

        fn close(&mut self) -> DriverResult<()> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    fn cursor(rows: u32, fail_at_end: bool, closes: &Rc<Cell<u32>>) -> RowCursor<'static> {
        RowCursor::new(
            Box::new(Counting {
                columns: vec![Column::new("N", SqlType::Integer)],
                remaining: rows,
                fail_at_end,
                closes: Rc::clone(closes),
            }),
            "SELECT N FROM T",
            CursorSource::Query,
        )
    }

    #[test]
    fn test_released_once_on_exhaustion() {
        let closes = Rc::new(Cell::new(0));
        let mut rows = cursor(3, false, &closes);
        assert_eq!(rows.column_names(), vec!["N"]);

        assert_eq!(rows.by_ref().count(), 3);
        assert_eq!(closes.get(), 1);
        assert!(rows.is_closed());
        assert!(rows.next().is_none());

        drop(rows);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_released_on_early_drop() {
        let closes = Rc::new(Cell::new(0));
        let mut rows = cursor(10, false, &closes);
        assert!(rows.next().is_some());
        assert_eq!(rows.rowcount(), 1);
        assert_eq!(closes.get(), 0);

        drop(rows);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_fetch_error_is_wrapped_and_releases() {
        let closes = Rc::new(Cell::new(0));
        let mut rows = cursor(1, true, &closes);
        assert!(rows.next().unwrap().is_ok());
        match rows.next() {
            Some(Err(Error::Query { statement, .. })) => assert_eq!(statement, "SELECT N FROM T"),
            other => panic!("Expected query error, got {:?}", other),
        }
        assert_eq!(closes.get(), 1);
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_explicit_close_then_drop() {
        let closes = Rc::new(Cell::new(0));
        let mut rows = cursor(5, false, &closes);
        rows.close().unwrap();
        rows.close().unwrap();
        drop(rows);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_empty_cursor() {
        let mut rows = RowCursor::empty("UPDATE T SET N = 0");
        assert!(rows.is_closed());
        assert_eq!(rows.num_columns(), 0);
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_fetch_all() {
        let closes = Rc::new(Cell::new(0));
        let rows = cursor(4, false, &closes).fetch_all().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].get(0), Some(&Value::Integer(3)));
        assert_eq!(closes.get(), 1);
    }
}
