//! Minimal FTP client (RFC 959) for storing text files.
//!
//! Only what uploads need: login, `CWD`, ASCII `STOR` over a passive data
//! connection, and `QUIT`.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{TransferError, TransferResult};

/// Default FTP control port.
pub const FTP_PORT: u16 = 21;

// Reply codes
pub const REPLY_FILE_STATUS_OK: u16 = 150;
pub const REPLY_DATA_CONNECTION_OPEN: u16 = 125;
pub const REPLY_COMMAND_OK: u16 = 200;
pub const REPLY_SUPERFLUOUS: u16 = 202;
pub const REPLY_SERVICE_READY: u16 = 220;
pub const REPLY_CLOSING_CONTROL: u16 = 221;
pub const REPLY_CLOSING_DATA: u16 = 226;
pub const REPLY_PASSIVE_MODE: u16 = 227;
pub const REPLY_LOGGED_IN: u16 = 230;
pub const REPLY_FILE_ACTION_OK: u16 = 250;
pub const REPLY_NEED_PASSWORD: u16 = 331;

/// A server reply: three-digit code and (possibly multi-line) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpReply {
    pub code: u16,
    pub message: String,
}

impl FtpReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 1xx.
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    fn require(self, accepted: &[u16]) -> TransferResult<Self> {
        if accepted.contains(&self.code) {
            Ok(self)
        } else {
            Err(TransferError::Reply {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// An FTP control connection.
pub struct FtpStream {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    peer: IpAddr,
    connect_timeout: Duration,
}

impl std::fmt::Debug for FtpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpStream").field("peer", &self.peer).finish()
    }
}

impl FtpStream {
    /// Open the control connection and read the server greeting.
    pub fn connect(host: &str, port: u16, connect_timeout: Duration) -> TransferResult<Self> {
        let mut last_error = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, connect_timeout),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .map(TransferError::Io)
            .unwrap_or_else(|| TransferError::protocol(format!("no addresses for {}", host))))
    }

    fn from_stream(stream: TcpStream, connect_timeout: Duration) -> TransferResult<Self> {
        let peer = stream.peer_addr()?.ip();
        let writer = stream.try_clone()?;
        let mut ftp = Self {
            reader: BufReader::new(stream),
            writer,
            peer,
            connect_timeout,
        };
        let greeting = ftp.read_reply()?.require(&[REPLY_SERVICE_READY])?;
        debug!(peer = %peer, greeting = %greeting.message, "FTP connected");
        Ok(ftp)
    }

    /// Log in with `USER`/`PASS`.
    pub fn login(&mut self, user: &str, password: &str) -> TransferResult<()> {
        let reply = self.command(&format!("USER {}", user))?;
        match reply.code {
            REPLY_LOGGED_IN => Ok(()),
            REPLY_NEED_PASSWORD => {
                self.command(&format!("PASS {}", password))?
                    .require(&[REPLY_LOGGED_IN, REPLY_SUPERFLUOUS])?;
                Ok(())
            }
            _ => Err(TransferError::Reply {
                code: reply.code,
                message: reply.message,
            }),
        }
    }

    /// Change the working directory.
    pub fn cwd(&mut self, path: &str) -> TransferResult<()> {
        self.command(&format!("CWD {}", path))?
            .require(&[REPLY_FILE_ACTION_OK, REPLY_COMMAND_OK])?;
        Ok(())
    }

    /// Switch to ASCII transfer type.
    pub fn ascii(&mut self) -> TransferResult<()> {
        self.command("TYPE A")?.require(&[REPLY_COMMAND_OK])?;
        Ok(())
    }

    /// Enter passive mode and return the data connection address.
    ///
    /// The host in the reply is ignored in favour of the control connection's
    /// peer; servers behind NAT routinely advertise unreachable addresses.
    pub fn pasv(&mut self) -> TransferResult<SocketAddr> {
        let reply = self.command("PASV")?.require(&[REPLY_PASSIVE_MODE])?;
        let port = parse_pasv_port(&reply.message)?;
        Ok(SocketAddr::new(self.peer, port))
    }

    /// Store text lines as `remote_name`, sending CRLF line endings.
    pub fn store_lines(&mut self, remote_name: &str, lines: &mut dyn BufRead) -> TransferResult<u64> {
        self.ascii()?;
        let addr = self.pasv()?;
        let data = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        self.command(&format!("STOR {}", remote_name))?
            .require(&[REPLY_FILE_STATUS_OK, REPLY_DATA_CONNECTION_OPEN])?;

        let mut sent = 0u64;
        let mut writer = BufWriter::new(data);
        let mut line = String::new();
        loop {
            line.clear();
            if lines.read_line(&mut line)? == 0 {
                break;
            }
            let text = line.trim_end_matches(['\r', '\n']);
            writer.write_all(text.as_bytes())?;
            writer.write_all(b"\r\n")?;
            sent += text.len() as u64 + 2;
        }
        let data = writer.into_inner().map_err(|e| e.into_error())?;
        data.shutdown(Shutdown::Both)?;
        drop(data);

        self.read_reply()?
            .require(&[REPLY_CLOSING_DATA, REPLY_FILE_ACTION_OK])?;
        debug!(remote_name, bytes = sent, "FTP store complete");
        Ok(sent)
    }

    /// Send `QUIT` and close the control connection.
    pub fn quit(&mut self) -> TransferResult<()> {
        let reply = self.command("QUIT")?;
        let _ = self.writer.shutdown(Shutdown::Both);
        reply.require(&[REPLY_CLOSING_CONTROL])?;
        Ok(())
    }

    /// Send a command line and read its reply.
    pub fn command(&mut self, line: &str) -> TransferResult<FtpReply> {
        if line.starts_with("PASS ") {
            trace!("FTP > PASS ****");
        } else {
            trace!("FTP > {}", line);
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;
        self.read_reply()
    }

    /// Read one reply, joining the lines of a multi-line reply.
    pub fn read_reply(&mut self) -> TransferResult<FtpReply> {
        let first = self.read_line()?;
        let code = parse_code(&first)?;
        let mut message = first.get(4..).unwrap_or_default().to_string();

        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{} ", code);
            loop {
                let next = self.read_line()?;
                if next.starts_with(&terminator) || next == code.to_string() {
                    message.push('\n');
                    message.push_str(next.get(4..).unwrap_or_default());
                    break;
                }
                message.push('\n');
                message.push_str(&next);
            }
        }
        trace!("FTP < {} {}", code, message);
        Ok(FtpReply { code, message })
    }

    fn read_line(&mut self) -> TransferResult<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(TransferError::protocol("connection closed by server"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn parse_code(line: &str) -> TransferResult<u16> {
    line.get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| TransferError::protocol(format!("malformed reply: {:?}", line)))
}

/// Extract the data port from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
fn parse_pasv_port(message: &str) -> TransferResult<u16> {
    let start = message
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| TransferError::protocol(format!("malformed PASV reply: {}", message)))?;
    let numbers: Vec<u8> = message[start..]
        .split(|c: char| !c.is_ascii_digit() && c != ',')
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|n| n.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| TransferError::protocol(format!("malformed PASV reply: {}", message)))?;

    match numbers.as_slice() {
        [_, _, _, _, p1, p2] => Ok(u16::from(*p1) << 8 | u16::from(*p2)),
        _ => Err(TransferError::protocol(format!(
            "malformed PASV reply: {}",
            message
        ))),
    }
}
