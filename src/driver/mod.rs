//! Database driver seam.
//!
//! A [`Driver`] opens a [`Session`] from an ODBC connection string. Sessions
//! execute SQL either on a fresh statement (queries) or on the session's
//! command cursor (CL command execution), handing back [`ResultSet`]s that
//! yield rows one at a time.
//!
//! The production backend is [`odbc::OdbcDriver`], enabled with the `odbc`
//! feature.

#[cfg(feature = "odbc")]
pub mod odbc;

use crate::error::DriverResult;
use crate::types::{Column, Value};

/// Opens database sessions.
pub trait Driver {
    /// Open a session for `connection_string` with the given autocommit mode.
    ///
    /// Sessions must be `Send` so a connection can move between threads.
    fn connect(
        &self,
        connection_string: &str,
        autocommit: bool,
    ) -> DriverResult<Box<dyn Session + Send>>;
}

/// An open database session.
///
/// Statement handles borrow the session, so no result set can outlive it.
pub trait Session {
    /// Allocate the long-lived command cursor.
    fn open_command_cursor(&mut self) -> DriverResult<()>;

    /// Execute `sql` on a new statement, binding `params` positionally.
    ///
    /// Returns `None` when the statement produced no result set.
    fn execute<'s>(
        &'s self,
        sql: &str,
        params: &[Value],
    ) -> DriverResult<Option<Box<dyn ResultSet + 's>>>;

    /// Execute `sql` on the command cursor.
    fn execute_command<'s>(&'s self, sql: &str) -> DriverResult<Option<Box<dyn ResultSet + 's>>>;

    /// Commit the current transaction.
    fn commit(&self) -> DriverResult<()>;

    /// Roll back the current transaction.
    fn rollback(&self) -> DriverResult<()>;

    /// Release the command cursor.
    fn close_command_cursor(&mut self) -> DriverResult<()>;

    /// Disconnect.
    fn close(&mut self) -> DriverResult<()>;
}

/// Rows produced by one executed statement.
pub trait ResultSet {
    /// Column descriptors, in result-set order.
    fn columns(&self) -> &[Column];

    /// Fetch the next row. Returns `Ok(None)` when exhausted.
    fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>>;

    /// Release the statement handle.
    fn close(&mut self) -> DriverResult<()> {
        Ok(())
    }
}
