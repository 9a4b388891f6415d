//! Recording in-memory driver and transport for connection tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use iseries_rs::driver::{Driver, ResultSet, Session};
use iseries_rs::error::{DriverError, DriverResult, TransferError, TransferResult};
use iseries_rs::transfer::{TransferSession, Transport};
use iseries_rs::{Column, ConnectParams, Connection, Credentials, Naming, SqlType, Value};

/// Failure switch shared with a mock.
#[derive(Default)]
pub struct Flag(AtomicBool);

impl Flag {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct Counter(AtomicU32);

impl Counter {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn incr(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared state of the mock database: scripted results and an event log.
#[derive(Default)]
pub struct DbState {
    pub events: Mutex<Vec<String>>,
    pub results: Mutex<HashMap<String, (Vec<Column>, Vec<Vec<Value>>)>>,
    pub failing: Mutex<Vec<String>>,
    pub fail_connect: Flag,
    pub fail_open_cursor: Flag,
    pub fail_close_cursor: Flag,
    pub fail_close: Flag,
    pub fail_release: Flag,
    /// Rows handed out across all result sets.
    pub fetched: Counter,
    pub released: Counter,
    pub connection_string: Mutex<Option<String>>,
    pub autocommit: Mutex<Option<bool>>,
}

impl DbState {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events naming a statement executed on the server.
    pub fn statements(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with("execute"))
            .collect()
    }

    /// Script the result set returned for `sql`.
    pub fn script(&self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns
            .iter()
            .map(|name| Column::new(*name, SqlType::VarChar))
            .collect();
        self.results
            .lock()
            .unwrap()
            .insert(sql.to_string(), (columns, rows));
    }

    /// Make execution of `sql` fail.
    pub fn fail_on(&self, sql: &str) {
        self.failing.lock().unwrap().push(sql.to_string());
    }
}

fn run(state: &Arc<DbState>, sql: &str) -> DriverResult<Option<MockResultSet>> {
    if state.failing.lock().unwrap().iter().any(|s| s == sql) {
        return Err(DriverError::with_state("42704", format!("{} not found", sql)));
    }
    Ok(state.results.lock().unwrap().get(sql).map(|(columns, rows)| MockResultSet {
        columns: columns.clone(),
        rows: rows.clone().into_iter(),
        state: Arc::clone(state),
    }))
}

#[derive(Clone)]
pub struct MockDriver {
    pub state: Arc<DbState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Arc::new(DbState::default()),
        }
    }
}

impl Driver for MockDriver {
    fn connect(&self, connection_string: &str, autocommit: bool) -> DriverResult<Box<dyn Session + Send>> {
        self.state.record("connect");
        *self.state.connection_string.lock().unwrap() = Some(connection_string.to_string());
        *self.state.autocommit.lock().unwrap() = Some(autocommit);
        if self.state.fail_connect.get() {
            return Err(DriverError::with_state("08001", "communication link failure"));
        }
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct MockSession {
    state: Arc<DbState>,
}

impl Session for MockSession {
    fn open_command_cursor(&mut self) -> DriverResult<()> {
        self.state.record("open_command_cursor");
        if self.state.fail_open_cursor.get() {
            return Err(DriverError::diagnostic("cannot allocate statement"));
        }
        Ok(())
    }

    fn execute<'s>(
        &'s self,
        sql: &str,
        params: &[Value],
    ) -> DriverResult<Option<Box<dyn ResultSet + 's>>> {
        if params.is_empty() {
            self.state.record(format!("execute {}", sql));
        } else {
            let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            self.state
                .record(format!("execute {} [{}]", sql, params.join(", ")));
        }
        Ok(run(&self.state, sql)?.map(|rs| Box::new(rs) as Box<dyn ResultSet + 's>))
    }

    fn execute_command<'s>(&'s self, sql: &str) -> DriverResult<Option<Box<dyn ResultSet + 's>>> {
        self.state.record(format!("execute_command {}", sql));
        Ok(run(&self.state, sql)?.map(|rs| Box::new(rs) as Box<dyn ResultSet + 's>))
    }

    fn commit(&self) -> DriverResult<()> {
        self.state.record("commit");
        Ok(())
    }

    fn rollback(&self) -> DriverResult<()> {
        self.state.record("rollback");
        Ok(())
    }

    fn close_command_cursor(&mut self) -> DriverResult<()> {
        self.state.record("close_command_cursor");
        if self.state.fail_close_cursor.get() {
            return Err(DriverError::diagnostic("cursor already closed"));
        }
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.state.record("close");
        if self.state.fail_close.get() {
            return Err(DriverError::with_state("08S01", "communication link failure"));
        }
        Ok(())
    }
}

pub struct MockResultSet {
    columns: Vec<Column>,
    rows: std::vec::IntoIter<Vec<Value>>,
    state: Arc<DbState>,
}

impl ResultSet for MockResultSet {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>> {
        let row = self.rows.next();
        if row.is_some() {
            self.state.fetched.incr();
        }
        Ok(row)
    }

    fn close(&mut self) -> DriverResult<()> {
        self.state.released.incr();
        if self.state.fail_release.get() {
            return Err(DriverError::with_state("HY010", "function sequence error"));
        }
        Ok(())
    }
}

/// Shared state of the mock file transport.
#[derive(Default)]
pub struct TransferState {
    pub events: Mutex<Vec<String>>,
    pub stored: Mutex<Vec<(String, Vec<String>)>>,
    pub login: Mutex<Option<(String, String)>>,
    pub fail_login: Flag,
    pub fail_cwd: Flag,
    pub fail_store: Flag,
}

impl TransferState {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub struct MockTransport {
    pub state: Arc<TransferState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(TransferState::default()),
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self, host: &str, credentials: &Credentials) -> TransferResult<Box<dyn TransferSession>> {
        self.state.events.lock().unwrap().push(format!("connect {}", host));
        *self.state.login.lock().unwrap() = Some((
            credentials.username().to_string(),
            credentials.password().to_string(),
        ));
        if self.state.fail_login.get() {
            return Err(TransferError::Reply {
                code: 530,
                message: "Log on attempt by user rejected".to_string(),
            });
        }
        Ok(Box::new(MockTransferSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockTransferSession {
    state: Arc<TransferState>,
}

impl TransferSession for MockTransferSession {
    fn change_dir(&mut self, path: &str) -> TransferResult<()> {
        self.state.events.lock().unwrap().push(format!("cwd {}", path));
        if self.state.fail_cwd.get() {
            return Err(TransferError::Reply {
                code: 550,
                message: "Specified library does not exist or cannot be accessed.".to_string(),
            });
        }
        Ok(())
    }

    fn store_lines(&mut self, remote_name: &str, lines: &mut dyn BufRead) -> TransferResult<u64> {
        self.state
            .events
            .lock()
            .unwrap()
            .push(format!("store {}", remote_name));
        if self.state.fail_store.get() {
            return Err(TransferError::protocol("data connection reset"));
        }
        let mut stored = Vec::new();
        let mut bytes = 0u64;
        for line in lines.lines() {
            let line = line?;
            bytes += line.len() as u64 + 2;
            stored.push(line);
        }
        self.state
            .stored
            .lock()
            .unwrap()
            .push((remote_name.to_string(), stored));
        Ok(bytes)
    }

    fn quit(&mut self) -> TransferResult<()> {
        self.state.events.lock().unwrap().push("quit".to_string());
        Ok(())
    }
}

pub fn params() -> ConnectParams {
    ConnectParams::new("as400.test", "jdoe", "s3cret", "MYLIB")
}

pub fn sql_params() -> ConnectParams {
    params().with_naming(Naming::Sql)
}

/// Connect with fresh mocks, returning their state handles.
pub fn connect(params: &ConnectParams) -> (Connection, Arc<DbState>, Arc<TransferState>) {
    let driver = MockDriver::new();
    let transport = MockTransport::new();
    let db = Arc::clone(&driver.state);
    let transfer = Arc::clone(&transport.state);
    let conn = Connection::connect_with(params, &driver, Box::new(transport))
        .expect("mock connect should succeed");
    (conn, db, transfer)
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
