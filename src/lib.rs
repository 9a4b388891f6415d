//! IBM i (iSeries/AS400) client for Rust
//!
//! Runs SQL over ODBC, executes CL commands through `QSYS.QCMDEXC` and reads
//! their outfiles back as rows, and uploads text files over FTP.
//!
//! The ODBC backend is behind the `odbc` feature. Without it, connections are
//! opened with [`Connection::connect_with`] and a caller-supplied
//! [`driver::Driver`].
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "odbc")]
//! # fn main() -> iseries_rs::Result<()> {
//! use iseries_rs::{ConnectParams, Connection, Naming};
//! use iseries_rs::command::DisplayObjectDescription;
//!
//! let params = ConnectParams::new("as400.local", "jdoe", "secret", "MYLIB")
//!     .with_naming(Naming::Sql);
//! let mut conn = Connection::connect_with_params(&params)?;
//!
//! for row in conn.query("SELECT CUSNO, CUSNAM FROM CUSTMAST", &[])? {
//!     let row = row?;
//!     println!("{} {}", row.get_trimmed("CUSNO")?, row.get_trimmed("CUSNAM")?);
//! }
//!
//! let objects = DisplayObjectDescription::new("MYLIB", "*ALL", "*FILE", "OBJS");
//! let count = conn.display_object_description(&objects)?.count();
//! println!("{} objects", count);
//!
//! conn.close();
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "odbc"))]
//! # fn main() {}
//! ```

pub mod command;
pub mod connection;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod params;
pub mod transfer;
pub mod types;
pub mod util;

// Re-export main types
pub use connection::Connection;
pub use cursor::RowCursor;
pub use error::{DriverError, Error, Result, TransferError};
pub use params::{ConnectParams, Credentials, Naming};
pub use types::{Column, ColumnInfo, Row, SqlType, Value};
