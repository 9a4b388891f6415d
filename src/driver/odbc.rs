//! ODBC backend built on `odbc-api`.
//!
//! Values are fetched through the driver's text conversion and typed from the
//! column's SQL type. Parameters are bound as character data except integers,
//! doubles and binary values; DB2 for i casts character parameters implicitly.

use std::sync::OnceLock;

use odbc_api::handles::StatementImpl;
use odbc_api::parameter::{InputParameter, VarBinaryBox, VarCharBox};
use odbc_api::{
    ColumnDescription, Connection, ConnectionOptions, Cursor, CursorImpl, DataType, Environment,
    Nullability, ResultSetMetadata,
};
use tracing::debug;

use super::{Driver, ResultSet, Session};
use crate::error::{DriverError, DriverResult};
use crate::types::{Column, SqlType, Value};

/// Process-wide ODBC environment.
fn environment() -> DriverResult<&'static Environment> {
    static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// Driver opening sessions through the system ODBC driver manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct OdbcDriver;

impl Driver for OdbcDriver {
    fn connect(
        &self,
        connection_string: &str,
        autocommit: bool,
    ) -> DriverResult<Box<dyn Session + Send>> {
        let connection = environment()?
            .connect_with_connection_string(connection_string, ConnectionOptions::default())?;
        connection.set_autocommit(autocommit)?;
        Ok(Box::new(OdbcSession {
            connection: Some(connection),
            command_cursor_open: false,
        }))
    }
}

/// Session over one ODBC connection.
///
/// `odbc-api` ties statement handles to a borrow of the connection, so the
/// command cursor allocates its statement per execution; exclusive use is
/// guaranteed by the borrow the returned result set holds.
pub struct OdbcSession {
    connection: Option<Connection<'static>>,
    command_cursor_open: bool,
}

// SAFETY: ODBC connection handles may move between threads; the environment
// is process-wide and statements never outlive a borrow of the session, so no
// handle is used from two threads at once.
unsafe impl Send for OdbcSession {}

impl OdbcSession {
    fn connection(&self) -> DriverResult<&Connection<'static>> {
        self.connection
            .as_ref()
            .ok_or_else(|| DriverError::with_state("08003", "connection does not exist"))
    }

    fn run<'s>(&'s self, sql: &str, params: &[Value]) -> DriverResult<Option<Box<dyn ResultSet + 's>>> {
        let connection = self.connection()?;
        let cursor = if params.is_empty() {
            connection.execute(sql, ())?
        } else {
            let bound: Vec<Box<dyn InputParameter>> = params.iter().map(bind).collect();
            connection.execute(sql, bound.as_slice())?
        };
        match cursor {
            Some(cursor) => Ok(Some(Box::new(OdbcResultSet::new(cursor)?))),
            None => Ok(None),
        }
    }
}

impl Session for OdbcSession {
    fn open_command_cursor(&mut self) -> DriverResult<()> {
        // Only marks the cursor open; each command allocates its own statement
        self.connection()?;
        self.command_cursor_open = true;
        Ok(())
    }

    fn execute<'s>(
        &'s self,
        sql: &str,
        params: &[Value],
    ) -> DriverResult<Option<Box<dyn ResultSet + 's>>> {
        self.run(sql, params)
    }

    fn execute_command<'s>(&'s self, sql: &str) -> DriverResult<Option<Box<dyn ResultSet + 's>>> {
        if !self.command_cursor_open {
            return Err(DriverError::with_state("24000", "command cursor is not open"));
        }
        self.run(sql, &[])
    }

    fn commit(&self) -> DriverResult<()> {
        self.connection()?.commit()?;
        Ok(())
    }

    fn rollback(&self) -> DriverResult<()> {
        self.connection()?.rollback()?;
        Ok(())
    }

    fn close_command_cursor(&mut self) -> DriverResult<()> {
        self.command_cursor_open = false;
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        // Dropping the handle disconnects
        self.connection.take();
        Ok(())
    }
}

/// Rows of one executed ODBC statement.
struct OdbcResultSet<'s> {
    cursor: Option<CursorImpl<StatementImpl<'s>>>,
    columns: Vec<Column>,
    buf: Vec<u8>,
}

impl<'s> OdbcResultSet<'s> {
    fn new(mut cursor: CursorImpl<StatementImpl<'s>>) -> DriverResult<Self> {
        let count = cursor.num_result_cols()?;
        let mut columns = Vec::with_capacity(count.max(0) as usize);
        let mut description = ColumnDescription::default();
        for index in 1..=count.max(0) as u16 {
            cursor.describe_col(index, &mut description)?;
            columns.push(Column {
                name: description.name_to_string().map_err(|e| {
                    DriverError::diagnostic(format!("column name is not valid text: {}", e))
                })?,
                nullable: !matches!(description.nullability, Nullability::NoNulls),
                data_type: sql_type(description.data_type),
            });
        }
        debug!(columns = columns.len(), "ODBC result set opened");
        Ok(Self {
            cursor: Some(cursor),
            columns,
            buf: Vec::new(),
        })
    }
}

impl ResultSet for OdbcResultSet<'_> {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>> {
        let Self {
            cursor,
            columns,
            buf,
        } = self;
        let Some(cursor) = cursor.as_mut() else {
            return Ok(None);
        };
        let Some(mut row) = cursor.next_row()? else {
            return Ok(None);
        };

        let mut values = Vec::with_capacity(columns.len());
        for (offset, column) in columns.iter().enumerate() {
            let index = (offset + 1) as u16;
            let value = if column.data_type == SqlType::Binary {
                if row.get_binary(index, buf)? {
                    Value::Binary(buf.clone())
                } else {
                    Value::Null
                }
            } else if row.get_text(index, buf)? {
                column
                    .data_type
                    .value_from_text(String::from_utf8_lossy(buf).into_owned())
            } else {
                Value::Null
            };
            values.push(value);
        }
        Ok(Some(values))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.cursor.take();
        Ok(())
    }
}

fn sql_type(data_type: DataType) -> SqlType {
    match data_type {
        DataType::Char { .. } | DataType::WChar { .. } => SqlType::Char,
        DataType::Varchar { .. }
        | DataType::WVarchar { .. }
        | DataType::LongVarchar { .. } => SqlType::VarChar,
        DataType::TinyInt | DataType::SmallInt => SqlType::SmallInt,
        DataType::Integer => SqlType::Integer,
        DataType::BigInt => SqlType::BigInt,
        DataType::Decimal { precision, scale } | DataType::Numeric { precision, scale } => {
            SqlType::Decimal {
                precision: precision as u16,
                scale: scale as i16,
            }
        }
        DataType::Real | DataType::Double | DataType::Float { .. } => SqlType::Double,
        DataType::Date => SqlType::Date,
        DataType::Time { .. } => SqlType::Time,
        DataType::Timestamp { .. } => SqlType::Timestamp,
        DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
            SqlType::Binary
        }
        _ => SqlType::Unknown,
    }
}

fn bind(value: &Value) -> Box<dyn InputParameter> {
    match value {
        Value::Integer(n) => Box::new(*n),
        Value::Double(n) => Box::new(*n),
        Value::Binary(bytes) => Box::new(VarBinaryBox::from_vec(bytes.clone())),
        other => match other.to_parameter_text() {
            Some(text) => Box::new(VarCharBox::from_string(text)),
            None => Box::new(VarCharBox::null()),
        },
    }
}
