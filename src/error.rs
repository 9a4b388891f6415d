//! Error types for the iSeries client.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for iSeries operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for driver-level operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Result type alias for file transfer operations.
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Error type for iSeries client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad arguments, detected before any I/O.
    #[error("Invalid argument: {message}")]
    Validation { message: String },

    /// Operation attempted on a closed connection.
    #[error("Cannot {operation} on a closed connection")]
    Closed { operation: &'static str },

    /// Operation not permitted in the current session mode.
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation { message: String },

    /// The driver could not establish the session.
    #[error("Connection to {host} failed: {source}")]
    Connection { host: String, source: DriverError },

    /// SQL statement execution or row retrieval failed.
    #[error("Query failed: {source}")]
    Query { statement: String, source: DriverError },

    /// CL command execution or output retrieval failed.
    #[error("CL command failed: {source}")]
    Command { command: String, source: DriverError },

    /// Local file does not exist.
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// File transfer to the remote host failed.
    #[error("File transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// Column not found in a row.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    /// Value could not be converted to the requested type.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// The underlying driver diagnostic, if this error wraps one.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Error::Connection { source, .. }
            | Error::Query { source, .. }
            | Error::Command { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Diagnostic reported by the database driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Error raised by the ODBC driver manager or driver.
    #[cfg(feature = "odbc")]
    #[error(transparent)]
    Odbc(#[from] odbc_api::Error),

    /// Driver diagnostic with an optional SQLSTATE.
    #[error("{}{message}", state_prefix(.state))]
    Diagnostic {
        state: Option<String>,
        message: String,
    },
}

impl DriverError {
    /// Create a diagnostic without SQLSTATE.
    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self::Diagnostic {
            state: None,
            message: message.into(),
        }
    }

    /// Create a diagnostic carrying a SQLSTATE.
    pub fn with_state(state: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Diagnostic {
            state: Some(state.into()),
            message: message.into(),
        }
    }
}

/// `[SQLSTATE] ` when a state is known.
fn state_prefix(state: &Option<String>) -> String {
    state
        .as_ref()
        .map(|state| format!("[{}] ", state))
        .unwrap_or_default()
}

/// Error raised by the file transfer channel.
#[derive(Error, Debug)]
pub enum TransferError {
    /// I/O error on the control or data connection, or reading the local file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Server answered with an unexpected reply code.
    #[error("Unexpected reply {code}: {message}")]
    Reply { code: u16, message: String },

    /// Reply could not be parsed.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl TransferError {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
