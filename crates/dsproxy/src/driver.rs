//! The driver surface that proxies wrap.
//!
//! A database driver exposes its objects through these traits. Proxies in
//! [`crate::proxy`] implement the same call surface on top of any driver, so
//! application code does not change when instrumentation is added.
//!
//! I/O-bound calls return futures; calls that only touch local driver state
//! (batch accumulation, parameter binding, column reads) are synchronous.
//! Connections are shared (`&self`), statements and result sets are used
//! through exclusive borrows (`&mut self`).

use crate::error::DbResult;
use crate::value::{ParameterKey, Value};
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Source of new connections.
pub trait DataSource: Send + Sync {
    /// Connection type produced by this data source.
    type Connection: Connection;

    /// Open a new connection.
    fn get_connection(&self) -> impl Future<Output = DbResult<Self::Connection>> + Send;
}

/// A live database connection.
pub trait Connection: Send + Sync {
    /// Plain statement type.
    type Statement: Statement;
    /// Prepared statement type.
    type Prepared: PreparedStatement;
    /// Callable (stored procedure) statement type.
    type Callable: CallableStatement;

    /// Create a plain statement.
    fn create_statement(&self) -> impl Future<Output = DbResult<Self::Statement>> + Send;

    /// Prepare `sql` for repeated parameterised execution.
    fn prepare_statement(
        &self,
        sql: &str,
    ) -> impl Future<Output = DbResult<Self::Prepared>> + Send;

    /// Prepare a stored procedure call.
    fn prepare_call(&self, sql: &str) -> impl Future<Output = DbResult<Self::Callable>> + Send;

    /// Switch auto-commit mode.
    fn set_auto_commit(&self, auto_commit: bool) -> impl Future<Output = DbResult<()>> + Send;

    /// Commit the current transaction.
    fn commit(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Roll back the current transaction.
    fn rollback(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Close the connection.
    fn close(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Whether the connection is closed.
    fn is_closed(&self) -> bool;
}

/// A plain (unprepared) statement.
pub trait Statement: Send {
    /// Result set type.
    type Rows: ResultSet;

    /// Execute any SQL; `true` when it produced a result set.
    fn execute(&mut self, sql: &str) -> impl Future<Output = DbResult<bool>> + Send;

    /// Execute a query returning rows.
    fn execute_query(&mut self, sql: &str) -> impl Future<Output = DbResult<Self::Rows>> + Send;

    /// Execute a mutation, returning the affected row count.
    fn execute_update(&mut self, sql: &str) -> impl Future<Output = DbResult<u64>> + Send;

    /// Queue `sql` in the statement's batch.
    fn add_batch(&mut self, sql: &str) -> DbResult<()>;

    /// Drop every queued batch entry.
    fn clear_batch(&mut self) -> DbResult<()>;

    /// Execute the queued batch, returning per-entry affected counts.
    fn execute_batch(&mut self) -> impl Future<Output = DbResult<Vec<u64>>> + Send;

    /// Result set of the last `execute`, if it produced one.
    fn result_set(&mut self) -> DbResult<Option<Self::Rows>>;

    /// Release the statement.
    fn close(&mut self) -> impl Future<Output = DbResult<()>> + Send;
}

/// A prepared statement with bound parameters.
pub trait PreparedStatement: Send {
    /// Result set type.
    type Rows: ResultSet;

    /// Bind a parameter.
    fn set_parameter(&mut self, key: ParameterKey, value: Value) -> DbResult<()>;

    /// Drop every bound parameter.
    fn clear_parameters(&mut self) -> DbResult<()>;

    /// Execute with the current bindings; `true` when it produced a result set.
    fn execute(&mut self) -> impl Future<Output = DbResult<bool>> + Send;

    /// Execute a query returning rows.
    fn execute_query(&mut self) -> impl Future<Output = DbResult<Self::Rows>> + Send;

    /// Execute a mutation, returning the affected row count.
    fn execute_update(&mut self) -> impl Future<Output = DbResult<u64>> + Send;

    /// Queue the current bindings as one batch entry.
    fn add_batch(&mut self) -> DbResult<()>;

    /// Drop every queued batch entry.
    fn clear_batch(&mut self) -> DbResult<()>;

    /// Execute the queued batch, returning per-entry affected counts.
    fn execute_batch(&mut self) -> impl Future<Output = DbResult<Vec<u64>>> + Send;

    /// Release the statement.
    fn close(&mut self) -> impl Future<Output = DbResult<()>> + Send;
}

/// A prepared stored-procedure call.
pub trait CallableStatement: PreparedStatement {
    /// Declare an OUT parameter and its SQL type.
    fn register_out_parameter(&mut self, key: ParameterKey, sql_type: &str) -> DbResult<()>;

    /// Read an OUT parameter after execution.
    fn out_parameter(&self, key: &ParameterKey) -> DbResult<Value>;
}

/// Rows produced by a query.
pub trait ResultSet: Send {
    /// Advance to the next row; `false` once exhausted.
    fn next(&mut self) -> impl Future<Output = DbResult<bool>> + Send;

    /// Read a column of the current row (1-based).
    fn get(&self, index: usize) -> DbResult<Value>;

    /// Read a column of the current row by name.
    fn get_by_name(&self, column: &str) -> DbResult<Value>;

    /// Release the result set.
    fn close(&mut self) -> impl Future<Output = DbResult<()>> + Send;
}

/// The statement flavour a query goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementKind {
    /// Plain statement
    Statement,
    /// Prepared statement
    Prepared,
    /// Callable statement
    Callable,
}

impl StatementKind {
    /// The proxied object role for this statement kind.
    pub fn target(self) -> TargetKind {
        match self {
            StatementKind::Statement => TargetKind::Statement,
            StatementKind::Prepared => TargetKind::PreparedStatement,
            StatementKind::Callable => TargetKind::CallableStatement,
        }
    }
}

/// The role of a proxied object, reported with every intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetKind {
    /// Data source
    DataSource,
    /// Connection
    Connection,
    /// Plain statement
    Statement,
    /// Prepared statement
    PreparedStatement,
    /// Callable statement
    CallableStatement,
    /// Result set
    ResultSet,
}

impl TargetKind {
    /// Stable name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::DataSource => "DataSource",
            TargetKind::Connection => "Connection",
            TargetKind::Statement => "Statement",
            TargetKind::PreparedStatement => "PreparedStatement",
            TargetKind::CallableStatement => "CallableStatement",
            TargetKind::ResultSet => "ResultSet",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
