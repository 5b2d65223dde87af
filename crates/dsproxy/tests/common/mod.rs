//! In-memory driver used by the integration tests.
//!
//! Every call made on a fake object is appended to a shared [`DriverLog`], so
//! tests can assert what the real driver actually received. Any SQL containing
//! `FAIL` makes the call return [`simulated_failure`], as does binding the text
//! value `bad` to a prepared statement.

#![allow(dead_code)]

use dsproxy::{
    CallableStatement, Connection, DataSource, DbError, DbResult, ParameterKey, PreparedStatement,
    ProxyConfig, ProxyDataSource, ResultSet, Statement, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct DriverEvent {
    pub method: &'static str,
    pub sql: Option<String>,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
pub struct DriverLog {
    events: Mutex<Vec<DriverEvent>>,
}

impl DriverLog {
    fn record(&self, method: &'static str, sql: Option<&str>, params: Vec<Value>) {
        self.events.lock().unwrap().push(DriverEvent {
            method,
            sql: sql.map(str::to_string),
            params,
        });
    }

    pub fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.events().into_iter().map(|e| e.method).collect()
    }

    /// SQL received by `method`, in call order.
    pub fn sql_for(&self, method: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.method == method)
            .filter_map(|e| e.sql)
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.events().iter().filter(|e| e.method == method).count()
    }
}

pub fn simulated_failure() -> DbError {
    DbError::driver("42000", "simulated failure")
}

fn check(sql: &str) -> DbResult<()> {
    if sql.contains("FAIL") {
        Err(simulated_failure())
    } else {
        Ok(())
    }
}

fn sample_rows() -> Vec<Vec<(String, Value)>> {
    (1..=2)
        .map(|id| {
            vec![
                ("id".to_string(), Value::Int(id)),
                ("name".to_string(), Value::Text(format!("row-{id}"))),
            ]
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FakeDataSource {
    pub log: Arc<DriverLog>,
    pub refuse_connections: bool,
}

impl FakeDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataSource for FakeDataSource {
    type Connection = FakeConnection;

    async fn get_connection(&self) -> DbResult<FakeConnection> {
        self.log.record("get_connection", None, Vec::new());
        if self.refuse_connections {
            return Err(DbError::Connection("connection refused".to_string()));
        }
        Ok(FakeConnection::new(self.log.clone()))
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    log: Arc<DriverLog>,
    closed: AtomicBool,
}

impl FakeConnection {
    pub fn new(log: Arc<DriverLog>) -> Self {
        Self {
            log,
            closed: AtomicBool::new(false),
        }
    }
}

impl Connection for FakeConnection {
    type Statement = FakeStatement;
    type Prepared = FakePrepared;
    type Callable = FakePrepared;

    async fn create_statement(&self) -> DbResult<FakeStatement> {
        self.log.record("create_statement", None, Vec::new());
        Ok(FakeStatement {
            log: self.log.clone(),
            batch: Vec::new(),
            last_rows: None,
        })
    }

    async fn prepare_statement(&self, sql: &str) -> DbResult<FakePrepared> {
        self.log.record("prepare_statement", Some(sql), Vec::new());
        check(sql)?;
        Ok(FakePrepared::new(self.log.clone(), sql))
    }

    async fn prepare_call(&self, sql: &str) -> DbResult<FakePrepared> {
        self.log.record("prepare_call", Some(sql), Vec::new());
        check(sql)?;
        Ok(FakePrepared::new(self.log.clone(), sql))
    }

    async fn set_auto_commit(&self, auto_commit: bool) -> DbResult<()> {
        self.log
            .record("set_auto_commit", None, vec![Value::Bool(auto_commit)]);
        Ok(())
    }

    async fn commit(&self) -> DbResult<()> {
        self.log.record("commit", None, Vec::new());
        Ok(())
    }

    async fn rollback(&self) -> DbResult<()> {
        self.log.record("rollback", None, Vec::new());
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        self.log.record("close", None, Vec::new());
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FakeStatement {
    log: Arc<DriverLog>,
    batch: Vec<String>,
    last_rows: Option<FakeResultSet>,
}

impl Statement for FakeStatement {
    type Rows = FakeResultSet;

    async fn execute(&mut self, sql: &str) -> DbResult<bool> {
        self.log.record("execute", Some(sql), Vec::new());
        check(sql)?;
        let is_query = sql.trim_start().to_ascii_uppercase().starts_with("SELECT");
        if is_query {
            self.last_rows = Some(FakeResultSet::new(self.log.clone(), sample_rows()));
        }
        Ok(is_query)
    }

    async fn execute_query(&mut self, sql: &str) -> DbResult<FakeResultSet> {
        self.log.record("execute_query", Some(sql), Vec::new());
        check(sql)?;
        Ok(FakeResultSet::new(self.log.clone(), sample_rows()))
    }

    async fn execute_update(&mut self, sql: &str) -> DbResult<u64> {
        self.log.record("execute_update", Some(sql), Vec::new());
        check(sql)?;
        Ok(1)
    }

    fn add_batch(&mut self, sql: &str) -> DbResult<()> {
        self.log.record("add_batch", Some(sql), Vec::new());
        check(sql)?;
        self.batch.push(sql.to_string());
        Ok(())
    }

    fn clear_batch(&mut self) -> DbResult<()> {
        self.log.record("clear_batch", None, Vec::new());
        self.batch.clear();
        Ok(())
    }

    async fn execute_batch(&mut self) -> DbResult<Vec<u64>> {
        self.log.record("execute_batch", None, Vec::new());
        Ok(vec![1; self.batch.len()])
    }

    fn result_set(&mut self) -> DbResult<Option<FakeResultSet>> {
        self.log.record("result_set", None, Vec::new());
        Ok(self.last_rows.take())
    }

    async fn close(&mut self) -> DbResult<()> {
        self.log.record("close_statement", None, Vec::new());
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakePrepared {
    log: Arc<DriverLog>,
    sql: String,
    params: Vec<(ParameterKey, Value)>,
    batch: Vec<Vec<Value>>,
    out_params: Vec<ParameterKey>,
}

impl FakePrepared {
    fn new(log: Arc<DriverLog>, sql: &str) -> Self {
        Self {
            log,
            sql: sql.to_string(),
            params: Vec::new(),
            batch: Vec::new(),
            out_params: Vec::new(),
        }
    }

    fn bound(&self) -> Vec<Value> {
        self.params.iter().map(|(_, v)| v.clone()).collect()
    }

    fn record_with_params(&self, method: &'static str) {
        self.log.record(method, Some(&self.sql), self.bound());
    }
}

impl PreparedStatement for FakePrepared {
    type Rows = FakeResultSet;

    fn set_parameter(&mut self, key: ParameterKey, value: Value) -> DbResult<()> {
        self.log
            .record("set_parameter", None, vec![Value::from(&key), value.clone()]);
        if value.as_str() == Some("bad") {
            return Err(simulated_failure());
        }
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
        Ok(())
    }

    fn clear_parameters(&mut self) -> DbResult<()> {
        self.log.record("clear_parameters", None, Vec::new());
        self.params.clear();
        Ok(())
    }

    async fn execute(&mut self) -> DbResult<bool> {
        self.record_with_params("execute");
        check(&self.sql)?;
        Ok(self.sql.to_ascii_uppercase().starts_with("SELECT"))
    }

    async fn execute_query(&mut self) -> DbResult<FakeResultSet> {
        self.record_with_params("execute_query");
        check(&self.sql)?;
        Ok(FakeResultSet::new(self.log.clone(), sample_rows()))
    }

    async fn execute_update(&mut self) -> DbResult<u64> {
        self.record_with_params("execute_update");
        check(&self.sql)?;
        Ok(1)
    }

    fn add_batch(&mut self) -> DbResult<()> {
        self.record_with_params("add_batch");
        let bound = self.bound();
        self.batch.push(bound);
        Ok(())
    }

    fn clear_batch(&mut self) -> DbResult<()> {
        self.log.record("clear_batch", None, Vec::new());
        self.batch.clear();
        Ok(())
    }

    async fn execute_batch(&mut self) -> DbResult<Vec<u64>> {
        self.log.record("execute_batch", Some(&self.sql), Vec::new());
        check(&self.sql)?;
        Ok(vec![1; self.batch.len()])
    }

    async fn close(&mut self) -> DbResult<()> {
        self.log.record("close_statement", None, Vec::new());
        Ok(())
    }
}

impl CallableStatement for FakePrepared {
    fn register_out_parameter(&mut self, key: ParameterKey, sql_type: &str) -> DbResult<()> {
        self.log.record(
            "register_out_parameter",
            None,
            vec![Value::from(&key), Value::from(sql_type)],
        );
        self.out_params.push(key);
        Ok(())
    }

    fn out_parameter(&self, key: &ParameterKey) -> DbResult<Value> {
        if self.out_params.contains(key) {
            Ok(Value::Int(42))
        } else {
            Err(DbError::not_found(format!("OUT parameter {key} not registered")))
        }
    }
}

#[derive(Debug)]
pub struct FakeResultSet {
    log: Arc<DriverLog>,
    rows: Vec<Vec<(String, Value)>>,
    position: Option<usize>,
}

impl FakeResultSet {
    fn new(log: Arc<DriverLog>, rows: Vec<Vec<(String, Value)>>) -> Self {
        Self {
            log,
            rows,
            position: None,
        }
    }

    fn current(&self) -> DbResult<&Vec<(String, Value)>> {
        self.position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| DbError::Other("no current row".to_string()))
    }
}

impl ResultSet for FakeResultSet {
    async fn next(&mut self) -> DbResult<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn get(&self, index: usize) -> DbResult<Value> {
        let row = self.current()?;
        index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| DbError::not_found(format!("column {index}")))
    }

    fn get_by_name(&self, column: &str) -> DbResult<Value> {
        self.current()?
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| DbError::not_found(format!("column {column}")))
    }

    async fn close(&mut self) -> DbResult<()> {
        self.log.record("close_rows", None, Vec::new());
        Ok(())
    }
}

/// Proxied fake data source plus the log of what the fake driver received.
pub fn proxied(config: ProxyConfig) -> (ProxyDataSource<FakeDataSource>, Arc<DriverLog>) {
    let real = FakeDataSource::new();
    let log = real.log.clone();
    (ProxyDataSource::new(real, config), log)
}
