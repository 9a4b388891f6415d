//! High-level Connection API for IBM i systems.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::command::{
    outfile_query, qcmdexc_call, ChangeDataArea, CopyFile, CreateFileOption,
    DisplayFileDescription, DisplayFileFieldDescription, DisplayObjectDescription, MemberOption,
};
use crate::cursor::{CursorSource, RowCursor};
use crate::driver::{Driver, Session};
use crate::error::{DriverError, Error, Result, TransferResult};
use crate::params::{ConnectParams, Credentials, Naming};
use crate::transfer::Transport;
use crate::types::Value;

/// Statement used by [`Connection::is_valid`].
const VALIDATION_QUERY: &str = "VALUES 1";

/// A connection to an IBM i system.
///
/// Owns one database session with a long-lived command cursor for CL
/// execution; queries run on their own statements. The connection is closed
/// when dropped.
///
/// `Connection` is `Send` but not `Sync`. Callers sharing one across threads
/// wrap it in a `Mutex`, which also keeps transaction effects of concurrent
/// writers from interleaving.
pub struct Connection {
    host: String,
    /// User profile, uppercased.
    user: String,
    library: String,
    naming: Naming,
    autocommit: bool,
    output_library: String,
    credentials: Credentials,
    session: Box<dyn Session + Send>,
    transport: Box<dyn Transport + Send>,
    closed: bool,
    /// Column names of the most recent query; empty after a statement
    /// without a result set.
    last_query_columns: RefCell<Vec<String>>,
    /// Errors swallowed while closing.
    close_errors: Vec<Error>,
}

impl Connection {
    /// Connect through the system ODBC driver with default settings
    /// (system naming, autocommit off).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use iseries_rs::Connection;
    ///
    /// # fn main() -> iseries_rs::Result<()> {
    /// let conn = Connection::connect("as400.local", "jdoe", "secret", "MYLIB")?;
    /// let rows = conn.query("SELECT * FROM CUSTMAST WHERE CUSNO = ?", &[42.into()])?;
    /// println!("{} columns", rows.num_columns());
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "odbc")]
    pub fn connect(host: &str, user: &str, password: &str, library: &str) -> Result<Self> {
        Self::connect_with_params(&ConnectParams::new(host, user, password, library))
    }

    /// Connect through the system ODBC driver and FTP with explicit parameters.
    #[cfg(feature = "odbc")]
    pub fn connect_with_params(params: &ConnectParams) -> Result<Self> {
        Self::connect_with(
            params,
            &crate::driver::odbc::OdbcDriver,
            Box::new(crate::transfer::FtpTransport::default()),
        )
    }

    /// Connect using an explicit driver and file transport.
    ///
    /// Parameters are validated before the driver is called.
    pub fn connect_with(
        params: &ConnectParams,
        driver: &dyn Driver,
        transport: Box<dyn Transport + Send>,
    ) -> Result<Self> {
        params.validate()?;

        info!(
            host = %params.host,
            user = %params.credentials.username(),
            library = %params.library,
            naming = ?params.naming,
            "Connecting to iSeries"
        );

        let connection_error = |source: DriverError| {
            error!(host = %params.host, error = %source, "Failed to connect to iSeries");
            Error::Connection {
                host: params.host.clone(),
                source,
            }
        };

        let mut session = driver
            .connect(&params.connection_string(), params.autocommit)
            .map_err(connection_error)?;
        if let Err(e) = session.open_command_cursor() {
            if let Err(close_err) = session.close() {
                warn!(error = %close_err, "Error while closing session after failed cursor open");
            }
            return Err(connection_error(e));
        }

        info!(host = %params.host, "Connected to iSeries");

        Ok(Self {
            host: params.host.clone(),
            user: params.credentials.username().to_uppercase(),
            library: params.library.clone(),
            naming: params.naming,
            autocommit: params.autocommit,
            output_library: params.output_library.clone(),
            credentials: params.credentials.clone(),
            session,
            transport,
            closed: false,
            last_query_columns: RefCell::new(Vec::new()),
            close_errors: Vec::new(),
        })
    }

    /// Close the command cursor and the session.
    ///
    /// Safe to call more than once; only the first call tears down. Teardown
    /// errors are logged and kept in [`Connection::close_errors`], and the
    /// connection is marked closed regardless.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.session.close_command_cursor() {
            warn!(error = %e, "Error while closing command cursor");
            self.close_errors.push(Error::Connection {
                host: self.host.clone(),
                source: e,
            });
        }
        if let Err(e) = self.session.close() {
            warn!(error = %e, "Error while closing connection");
            self.close_errors.push(Error::Connection {
                host: self.host.clone(),
                source: e,
            });
        }
        info!(host = %self.host, "Connection closed");
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.closed {
            Err(Error::Closed { operation })
        } else {
            Ok(())
        }
    }

    /// Execute a SQL statement and return its rows lazily.
    ///
    /// Runs on a fresh statement, so it does not disturb CL command output
    /// being read from the command cursor. Parameters are bound positionally
    /// to `?` markers.
    ///
    /// Afterwards [`Connection::last_query_columns`] holds the result column names.
    /// It is cleared if the statement produced no result set (INSERT, UPDATE,
    /// CALL, ...), in which case the returned cursor is empty.
    pub fn query(&self, statement: &str, parameters: &[Value]) -> Result<RowCursor<'_>> {
        self.ensure_open("execute query")?;

        debug!(statement = %truncate(statement, 100), params = parameters.len(), "Executing query");
        let result = self.session.execute(statement, parameters).map_err(|source| {
            error!(error = %source, "Query execution failed");
            Error::Query {
                statement: statement.to_string(),
                source,
            }
        })?;

        match result {
            Some(result_set) => {
                let cursor = RowCursor::new(result_set, statement, CursorSource::Query);
                let names: Vec<String> = cursor.column_names().into_iter().map(String::from).collect();
                debug!(columns = names.len(), "Query returned a result set");
                *self.last_query_columns.borrow_mut() = names;
                Ok(cursor)
            }
            None => {
                debug!("Query executed (no result set)");
                self.last_query_columns.borrow_mut().clear();
                Ok(RowCursor::empty(statement))
            }
        }
    }

    /// Execute a CL command through `QSYS.QCMDEXC`.
    ///
    /// With `output_table`, the command is expected to write an outfile of
    /// that name into the output library, whose rows are then returned.
    /// Requires SQL naming.
    pub fn execute_cl_command(
        &self,
        command: &str,
        output_table: Option<&str>,
    ) -> Result<Option<RowCursor<'_>>> {
        self.ensure_open("execute CL command")?;
        if self.naming == Naming::Db2 {
            return Err(Error::unsupported(
                "CL command execution requires SQL naming (naming=0)",
            ));
        }

        let command_error = |source: DriverError| {
            error!(error = %source, "CL command execution failed");
            Error::Command {
                command: command.to_string(),
                source,
            }
        };

        info!(command, "Executing CL command");
        // Only the call's side effects matter
        if let Some(mut result_set) = self
            .session
            .execute_command(&qcmdexc_call(command))
            .map_err(command_error)?
        {
            if let Err(e) = result_set.close() {
                warn!(error = %e, "Error while releasing command cursor");
            }
        }

        let Some(output_table) = output_table else {
            info!("CL command executed successfully");
            return Ok(None);
        };

        let select = outfile_query(&self.output_library, output_table);
        debug!(table = %select, "Retrieving CL command output");
        let rows = self
            .session
            .execute_command(&select)
            .map_err(command_error)?
            .map(|result_set| RowCursor::new(result_set, command, CursorSource::Command))
            .unwrap_or_else(|| RowCursor::empty(command));
        Ok(Some(rows))
    }

    /// Run a builder-produced command whose outfile is always read back.
    fn execute_to_outfile(&self, command: &str, output: &str) -> Result<RowCursor<'_>> {
        self.execute_cl_command(command, Some(output))?
            .ok_or_else(|| Error::unsupported("CL command produced no output"))
    }

    /// DSPFD into an outfile, returning its rows.
    ///
    /// ```no_run
    /// # fn run(conn: &iseries_rs::Connection) -> iseries_rs::Result<()> {
    /// use iseries_rs::command::DisplayFileDescription;
    /// use iseries_rs::util::rand_filename;
    ///
    /// let output = rand_filename(6)?;
    /// for row in conn.display_file_description(&DisplayFileDescription::new("MYLIB", &output))? {
    ///     let row = row?;
    ///     println!("{} {}", row.get_trimmed("MBFILE")?, row.get_trimmed("MBNRCD")?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn display_file_description(
        &self,
        description: &DisplayFileDescription,
    ) -> Result<RowCursor<'_>> {
        self.execute_to_outfile(&description.command(&self.output_library), &description.output)
    }

    /// DSPOBJD into an outfile, returning its rows.
    pub fn display_object_description(
        &self,
        description: &DisplayObjectDescription,
    ) -> Result<RowCursor<'_>> {
        self.execute_to_outfile(&description.command(&self.output_library), &description.output)
    }

    /// DSPFFD into an outfile, returning its rows.
    pub fn display_file_field_description(
        &self,
        description: &DisplayFileFieldDescription,
    ) -> Result<RowCursor<'_>> {
        self.execute_to_outfile(&description.command(&self.output_library), &description.output)
    }

    /// CPYF between libraries.
    ///
    /// `member_option` is one of `*NONE`, `*ADD`, `*REPLACE`, `*UPDADD` and
    /// `create_file` one of `*NO`, `*YES`; anything else is rejected before a
    /// command is issued.
    pub fn copy_file(
        &self,
        from_table: &str,
        from_library: &str,
        to_table: &str,
        to_library: &str,
        member_option: &str,
        create_file: &str,
    ) -> Result<()> {
        let copy = CopyFile {
            from_table: from_table.to_string(),
            from_library: from_library.to_string(),
            to_table: to_table.to_string(),
            to_library: to_library.to_string(),
            member_option: member_option.parse::<MemberOption>()?,
            create_file: create_file.parse::<CreateFileOption>()?,
        };
        self.execute_cl_command(&copy.command(), None)?;
        Ok(())
    }

    /// CHGDTAARA to set a data area's value.
    pub fn change_data_area(&self, data_area: &str, library: &str, value: &str) -> Result<()> {
        let change = ChangeDataArea {
            data_area: data_area.to_string(),
            library: library.to_string(),
            value: value.to_string(),
        };
        self.execute_cl_command(&change.command(), None)?;
        Ok(())
    }

    /// Upload a text file into `library` over the file transport.
    ///
    /// The remote member is named after the file's base name. The transfer
    /// session is closed whether or not the upload succeeds.
    pub fn upload_file(&self, path: impl AsRef<Path>, library: &str) -> Result<u64> {
        self.ensure_open("upload file")?;
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::NotFound {
                path: path.to_path_buf(),
            })?;

        info!(file = %file_name, library, "Starting file upload");
        let result = self.transfer(path, &file_name, library);
        match &result {
            Ok(bytes) => info!(file = %file_name, bytes, "Upload complete"),
            Err(e) => error!(file = %file_name, error = %e, "Upload failed"),
        }
        result.map_err(Error::from)
    }

    fn transfer(&self, path: &Path, file_name: &str, library: &str) -> TransferResult<u64> {
        let mut reader = BufReader::new(File::open(path)?);
        // Log in as the stored (uppercased) user profile
        let credentials = Credentials::new(self.user.clone(), self.credentials.password());
        let mut session = self.transport.connect(&self.host, &credentials)?;

        let result = session
            .change_dir(library)
            .and_then(|()| session.store_lines(file_name, &mut reader));
        if let Err(e) = session.quit() {
            warn!(error = %e, "Error while closing transfer session");
        }
        result
    }

    /// Commit the current transaction.
    pub fn commit(&self) -> Result<()> {
        self.ensure_open("commit")?;
        self.session.commit().map_err(|source| Error::Query {
            statement: "COMMIT".to_string(),
            source,
        })
    }

    /// Roll back the current transaction.
    pub fn rollback(&self) -> Result<()> {
        self.ensure_open("roll back")?;
        self.session.rollback().map_err(|source| Error::Query {
            statement: "ROLLBACK".to_string(),
            source,
        })
    }

    /// Check if the connection is usable.
    ///
    /// With `check_connection`, runs a trivial statement on the server;
    /// otherwise only the local state is checked.
    pub fn is_valid(&self, check_connection: bool) -> bool {
        if self.closed {
            return false;
        }
        if !check_connection {
            return true;
        }
        match self.session.execute(VALIDATION_QUERY, &[]) {
            Ok(result) => {
                if let Some(mut result_set) = result {
                    if let Err(e) = result_set.close() {
                        debug!(error = %e, "Error while releasing validation cursor");
                    }
                }
                true
            }
            Err(e) => {
                debug!(error = %e, "Connection validation failed");
                false
            }
        }
    }

    /// Column names of the most recent query, in column order.
    ///
    /// Empty before any query and after a statement without a result set.
    pub fn last_query_columns(&self) -> Vec<String> {
        self.last_query_columns.borrow().clone()
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// User profile, uppercased.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Default library.
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Naming convention of the session.
    pub fn naming(&self) -> Naming {
        self.naming
    }

    /// Get auto-commit mode.
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Library receiving display-command outfiles.
    pub fn output_library(&self) -> &str {
        &self.output_library
    }

    /// Check if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Errors swallowed by [`Connection::close`].
    pub fn close_errors(&self) -> &[Error] {
        &self.close_errors
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.closed { "closed" } else { "connected" };
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("library", &self.library)
            .field("naming", &self.naming)
            .field("autocommit", &self.autocommit)
            .field("state", &state)
            .finish()
    }
}

/// Shorten a statement for logging.
fn truncate(statement: &str, max_chars: usize) -> &str {
    match statement.char_indices().nth(max_chars) {
        Some((idx, _)) => &statement[..idx],
        None => statement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("SELECT * FROM T", 6), "SELECT");
        assert_eq!(truncate("SELECT", 100), "SELECT");
        assert_eq!(truncate("ÉÉÉ", 2), "ÉÉ");
    }
}
