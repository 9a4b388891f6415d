//! File transfer into the system's library filesystem.
//!
//! A [`Transport`] opens an authenticated [`TransferSession`]; the built-in
//! [`FtpTransport`] speaks plaintext FTP to the host's FTP server.

pub mod ftp;

use std::io::BufRead;
use std::time::Duration;

use crate::error::TransferResult;
use crate::params::Credentials;

pub use ftp::{FtpReply, FtpStream, FTP_PORT};

/// Opens file transfer sessions.
pub trait Transport {
    /// Connect and log in to `host`.
    fn connect(&self, host: &str, credentials: &Credentials) -> TransferResult<Box<dyn TransferSession>>;
}

/// An authenticated file transfer session.
pub trait TransferSession {
    /// Change the remote working directory (a library under system naming).
    fn change_dir(&mut self, path: &str) -> TransferResult<()>;

    /// Store `lines` as text under `remote_name`, returning the bytes sent.
    fn store_lines(&mut self, remote_name: &str, lines: &mut dyn BufRead) -> TransferResult<u64>;

    /// Log out and close the control connection.
    fn quit(&mut self) -> TransferResult<()>;
}

/// FTP transport.
#[derive(Debug, Clone)]
pub struct FtpTransport {
    /// Control connection port (default: 21).
    pub port: u16,
    /// TCP connect timeout for control and data connections (default: 30 seconds).
    pub connect_timeout: Duration,
}

impl Default for FtpTransport {
    fn default() -> Self {
        Self {
            port: FTP_PORT,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl FtpTransport {
    /// Use a non-standard control port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Transport for FtpTransport {
    fn connect(&self, host: &str, credentials: &Credentials) -> TransferResult<Box<dyn TransferSession>> {
        let mut stream = FtpStream::connect(host, self.port, self.connect_timeout)?;
        stream.login(credentials.username(), credentials.password())?;
        Ok(Box::new(stream))
    }
}

impl TransferSession for FtpStream {
    fn change_dir(&mut self, path: &str) -> TransferResult<()> {
        self.cwd(path)
    }

    fn store_lines(&mut self, remote_name: &str, lines: &mut dyn BufRead) -> TransferResult<u64> {
        FtpStream::store_lines(self, remote_name, lines)
    }

    fn quit(&mut self) -> TransferResult<()> {
        FtpStream::quit(self)
    }
}
