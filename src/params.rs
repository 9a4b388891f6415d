//! Connection parameters and ODBC connection string construction.

use std::env;
use std::fmt;

use crate::error::{Error, Result};

/// Default ODBC driver name registered by IBM i Access.
pub const DEFAULT_DRIVER_NAME: &str = "iSeries Access ODBC Driver";

/// Library receiving the outfiles of display commands.
pub const DEFAULT_OUTPUT_LIBRARY: &str = "QTEMP";

/// Object naming convention of the session (ODBC `NAM` keyword).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Naming {
    /// SQL naming: `SCHEMA.TABLE`. Required for CL command execution.
    Sql,
    /// System naming: `LIBRARY/FILE`, resolved through the library list.
    #[default]
    Db2,
}

impl Naming {
    /// Numeric flag passed as `NAM=` in the connection string.
    pub fn flag(self) -> i32 {
        match self {
            Naming::Sql => 0,
            Naming::Db2 => 1,
        }
    }
}

impl TryFrom<i32> for Naming {
    type Error = Error;

    fn try_from(flag: i32) -> Result<Self> {
        match flag {
            0 => Ok(Naming::Sql),
            1 => Ok(Naming::Db2),
            other => Err(Error::validation(format!(
                "naming convention must be 0 (SQL) or 1 (DB2), got {}",
                other
            ))),
        }
    }
}

/// User credentials, shared by the database session and file transfer.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// User profile name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Host name or address of the system.
    pub host: String,
    /// User profile and password.
    pub credentials: Credentials,
    /// Default library (`DBQ`).
    pub library: String,
    /// Naming convention (default: system naming).
    pub naming: Naming,
    /// Whether each statement commits on its own (default: false).
    pub autocommit: bool,
    /// ODBC driver name.
    pub driver_name: String,
    /// Library receiving display-command outfiles.
    pub output_library: String,
}

impl ConnectParams {
    /// Create new connection parameters with system naming and autocommit off.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        library: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            credentials: Credentials::new(user, password),
            library: library.into(),
            naming: Naming::default(),
            autocommit: false,
            driver_name: DEFAULT_DRIVER_NAME.to_string(),
            output_library: DEFAULT_OUTPUT_LIBRARY.to_string(),
        }
    }

    /// Set the naming convention.
    ///
    /// # Example
    ///
    /// ```
    /// use iseries_rs::{ConnectParams, Naming};
    ///
    /// let params = ConnectParams::new("as400.local", "jdoe", "secret", "MYLIB")
    ///     .with_naming(Naming::Sql);
    /// assert!(params.connection_string().ends_with("NAM=0"));
    /// ```
    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    /// Set the autocommit mode.
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Use a different ODBC driver name (e.g. `IBM i Access ODBC Driver`).
    pub fn with_driver_name(mut self, driver_name: impl Into<String>) -> Self {
        self.driver_name = driver_name.into();
        self
    }

    /// Write display-command outfiles to another library.
    pub fn with_output_library(mut self, library: impl Into<String>) -> Self {
        self.output_library = library.into();
        self
    }

    /// Read parameters from `ISERIES_*` environment variables.
    ///
    /// `ISERIES_HOST`, `ISERIES_USER`, `ISERIES_PASSWORD` and `ISERIES_LIBRARY`
    /// are required. `ISERIES_NAMING` (0 or 1), `ISERIES_AUTOCOMMIT`
    /// (`true`/`false`/`1`/`0`) and `ISERIES_ODBC_DRIVER` are optional.
    pub fn from_env() -> Result<Self> {
        let mut params = Self::new(
            required_var("ISERIES_HOST")?,
            required_var("ISERIES_USER")?,
            required_var("ISERIES_PASSWORD")?,
            required_var("ISERIES_LIBRARY")?,
        );

        if let Ok(naming) = env::var("ISERIES_NAMING") {
            let flag = naming.trim().parse::<i32>().map_err(|_| {
                Error::validation(format!("ISERIES_NAMING is not a number: {}", naming))
            })?;
            params.naming = Naming::try_from(flag)?;
        }

        if let Ok(autocommit) = env::var("ISERIES_AUTOCOMMIT") {
            params.autocommit = match autocommit.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::validation(format!(
                        "ISERIES_AUTOCOMMIT must be true or false, got {}",
                        other
                    )))
                }
            };
        }

        if let Ok(driver_name) = env::var("ISERIES_ODBC_DRIVER") {
            params.driver_name = driver_name;
        }

        Ok(params)
    }

    /// Check that every required field is present.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("host", self.host.as_str()),
            ("user", self.credentials.username()),
            ("password", self.credentials.password()),
            ("library", self.library.as_str()),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "connection parameters are required: {}",
                missing.join(", ")
            )))
        }
    }

    /// Build the ODBC connection string.
    ///
    /// Parameters are embedded verbatim, password included, so the result must
    /// never be logged.
    pub fn connection_string(&self) -> String {
        format!(
            "driver={{{}}};SYSTEM={};UserID={};PWD={};AllowUnsupportedChar=1;DBQ={};XDYNAMIC=0;NAM={}",
            self.driver_name,
            self.host,
            self.credentials.username(),
            self.credentials.password(),
            self.library,
            self.naming.flag()
        )
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::validation(format!("environment variable {} is not set", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string() {
        let params = ConnectParams::new("as400.local", "jdoe", "s3cret", "MVXBDTA010");
        assert_eq!(
            params.connection_string(),
            "driver={iSeries Access ODBC Driver};SYSTEM=as400.local;UserID=jdoe;PWD=s3cret;\
             AllowUnsupportedChar=1;DBQ=MVXBDTA010;XDYNAMIC=0;NAM=1"
        );
    }

    #[test]
    fn test_defaults() {
        let params = ConnectParams::new("h", "u", "p", "l");
        assert_eq!(params.naming, Naming::Db2);
        assert!(!params.autocommit);
        assert_eq!(params.output_library, "QTEMP");
    }

    #[test]
    fn test_builder_overrides() {
        let params = ConnectParams::new("h", "u", "p", "l")
            .with_naming(Naming::Sql)
            .with_autocommit(true)
            .with_driver_name("IBM i Access ODBC Driver");
        assert!(params.autocommit);
        assert!(params
            .connection_string()
            .starts_with("driver={IBM i Access ODBC Driver};"));
        assert!(params.connection_string().ends_with(";NAM=0"));
    }

    #[test]
    fn test_naming_from_flag() {
        assert_eq!(Naming::try_from(0).unwrap(), Naming::Sql);
        assert_eq!(Naming::try_from(1).unwrap(), Naming::Db2);
        assert!(matches!(Naming::try_from(2), Err(Error::Validation { .. })));
        assert!(matches!(Naming::try_from(-1), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let params = ConnectParams::new("h", "", "", "l");
        match params.validate() {
            Err(Error::Validation { message }) => {
                assert!(message.contains("user"));
                assert!(message.contains("password"));
                assert!(!message.contains("host"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert!(ConnectParams::new("h", "u", "p", "l").validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("JDOE", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("JDOE"));
        assert!(!debug.contains("hunter2"));
    }
}
