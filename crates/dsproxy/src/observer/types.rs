use crate::driver::{StatementKind, TargetKind};
use crate::error::DbError;
use crate::identity::ConnectionInfo;
use crate::value::{QueryInfo, Value};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Summary of a successful call's return value.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    /// The call returned nothing.
    Unit,
    /// The call returned a flag (`execute`, `next`, `is_closed`).
    Bool(bool),
    /// The call returned an affected row count.
    Affected(u64),
    /// The call returned per-entry batch counts.
    BatchCounts(Vec<u64>),
    /// The call returned a value (column or OUT parameter reads).
    Value(Value),
    /// The call returned a new driver object, which the caller receives proxied.
    Created(TargetKind),
}

impl fmt::Display for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallResult::Unit => f.write_str("ok"),
            CallResult::Bool(b) => write!(f, "{b}"),
            CallResult::Affected(n) => write!(f, "{n} affected"),
            CallResult::BatchCounts(counts) => write!(f, "batch {counts:?}"),
            CallResult::Value(v) => write!(f, "{v}"),
            CallResult::Created(target) => write!(f, "new {target}"),
        }
    }
}

/// Queries sent to the driver by one execute call.
///
/// For a batch execution this holds every entry accumulated since the last
/// clear, in the order they were added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    /// Statement flavour that ran the queries.
    pub statement: StatementKind,
    /// Whether this is a batch execution.
    pub is_batch: bool,
    /// Executed queries in order.
    pub queries: Vec<QueryInfo>,
}

impl ExecutionRecord {
    /// A single, non-batch execution.
    pub fn single(statement: StatementKind, query: QueryInfo) -> Self {
        Self {
            statement,
            is_batch: false,
            queries: vec![query],
        }
    }

    /// A batch execution of `queries`.
    pub fn batch(statement: StatementKind, queries: Vec<QueryInfo>) -> Self {
        Self {
            statement,
            is_batch: true,
            queries,
        }
    }

    /// Number of batch entries (0 for a non-batch execution).
    pub fn batch_size(&self) -> usize {
        if self.is_batch { self.queries.len() } else { 0 }
    }

    /// Query texts in execution order.
    pub fn query_texts(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.query.as_str()).collect()
    }
}

/// Everything known about one intercepted call.
///
/// The same envelope is handed to [`Observer::on_before`] and, once the real
/// call returned, to [`Observer::on_after`] with `elapsed` and either `result`
/// or `thrown` filled in.
#[derive(Debug, Clone)]
pub struct CallEnvelope<'a> {
    /// Process-wide, strictly increasing call number.
    pub sequence: u64,
    /// Identity of the logical connection (`None` for data source calls).
    pub connection: Option<&'a ConnectionInfo>,
    /// Name of the data source the proxy was configured with.
    pub data_source_name: &'a str,
    /// Role of the proxied object.
    pub target: TargetKind,
    /// Method being called.
    pub method: &'static str,
    /// Arguments as forwarded to the real object.
    pub args: Vec<Value>,
    /// Queries executed by this call, for execute calls.
    pub execution: Option<ExecutionRecord>,
    /// Time spent in the real call (zero before it runs).
    pub elapsed: Duration,
    /// Successful outcome, after the call.
    pub result: Option<CallResult>,
    /// Error returned by the real call, after the call.
    pub thrown: Option<&'a DbError>,
}

impl CallEnvelope<'_> {
    /// Id of the logical connection, if any.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection.map(ConnectionInfo::id)
    }

    /// Whether the call has completed successfully.
    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.thrown.is_none()
    }

    /// Whether this call is a batch execution.
    pub fn is_batch(&self) -> bool {
        self.execution.as_ref().is_some_and(|e| e.is_batch)
    }

    /// Text of the first executed query, if this is an execute call.
    pub fn query(&self) -> Option<&str> {
        self.execution
            .as_ref()
            .and_then(|e| e.queries.first())
            .map(|q| q.query.as_str())
    }
}

/// Observer notified around every intercepted call.
///
/// Observers run synchronously on the calling task, in registration order. They
/// must be cheap and must not block. A panicking observer is isolated by the
/// chain: the remaining observers still run and the caller never sees it.
pub trait Observer: Send + Sync {
    /// Called before the real call runs.
    ///
    /// Default implementation does nothing.
    fn on_before(&self, _call: &CallEnvelope<'_>) {}

    /// Called after the real call returned or failed.
    fn on_after(&self, call: &CallEnvelope<'_>);
}
