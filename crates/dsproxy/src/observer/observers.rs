use super::types::{CallEnvelope, CallResult, ExecutionRecord, Observer};
use crate::driver::TargetKind;
use crate::error::DbError;
use crate::sql::QueryType;
use crate::value::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// An observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_after(&self, _call: &CallEnvelope<'_>) {}
}

/// An observer that forwards to several observers in order.
///
/// Unlike [`ObserverChain`](super::ObserverChain), a panic in one member
/// stops the remaining members of this composite.
pub struct CompositeObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl CompositeObserver {
    /// Create an empty composite observer.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Add an observer.
    #[allow(clippy::should_implement_trait)]
    pub fn add<O: Observer + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Add an Arc-wrapped observer.
    pub fn add_arc(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl Default for CompositeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for CompositeObserver {
    fn on_before(&self, call: &CallEnvelope<'_>) {
        for observer in &self.observers {
            observer.on_before(call);
        }
    }

    fn on_after(&self, call: &CallEnvelope<'_>) {
        for observer in &self.observers {
            observer.on_after(call);
        }
    }
}

/// Counts calls and executed queries.
#[derive(Debug, Default)]
pub struct CountObserver {
    total_calls: AtomicU64,
    failed_calls: AtomicU64,
    executions: AtomicU64,
    failed_executions: AtomicU64,
    batch_executions: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    call_count: AtomicU64,
    other_count: AtomicU64,
    total_query_nanos: AtomicU64,
}

/// Snapshot of a [`CountObserver`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCounts {
    /// Every intercepted call.
    pub total_calls: u64,
    /// Intercepted calls whose real call failed.
    pub failed_calls: u64,
    /// Execute calls (single or batch).
    pub executions: u64,
    /// Execute calls that failed.
    pub failed_executions: u64,
    /// Batch execute calls.
    pub batch_executions: u64,
    /// SELECT queries executed (each batch entry counts).
    pub select_count: u64,
    /// INSERT queries executed.
    pub insert_count: u64,
    /// UPDATE queries executed.
    pub update_count: u64,
    /// DELETE queries executed.
    pub delete_count: u64,
    /// Stored procedure calls executed.
    pub call_count: u64,
    /// Other queries executed.
    pub other_count: u64,
    /// Time spent in execute calls.
    pub total_query_time: Duration,
}

impl QueryCounts {
    /// Total queries executed across all types.
    pub fn total_queries(&self) -> u64 {
        self.select_count
            + self.insert_count
            + self.update_count
            + self.delete_count
            + self.call_count
            + self.other_count
    }
}

impl CountObserver {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current counts.
    pub fn stats(&self) -> QueryCounts {
        QueryCounts {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            failed_executions: self.failed_executions.load(Ordering::Relaxed),
            batch_executions: self.batch_executions.load(Ordering::Relaxed),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            call_count: self.call_count.load(Ordering::Relaxed),
            other_count: self.other_count.load(Ordering::Relaxed),
            total_query_time: Duration::from_nanos(self.total_query_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Reset all counts.
    pub fn reset(&self) {
        for counter in [
            &self.total_calls,
            &self.failed_calls,
            &self.executions,
            &self.failed_executions,
            &self.batch_executions,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.call_count,
            &self.other_count,
            &self.total_query_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn count_execution(&self, execution: &ExecutionRecord, call: &CallEnvelope<'_>) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        if call.thrown.is_some() {
            self.failed_executions.fetch_add(1, Ordering::Relaxed);
        }
        if execution.is_batch {
            self.batch_executions.fetch_add(1, Ordering::Relaxed);
        }

        for query in &execution.queries {
            let counter = match QueryType::from_sql(&query.query) {
                QueryType::Select => &self.select_count,
                QueryType::Insert => &self.insert_count,
                QueryType::Update => &self.update_count,
                QueryType::Delete => &self.delete_count,
                QueryType::Call => &self.call_count,
                QueryType::Other => &self.other_count,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let nanos = u64::try_from(call.elapsed.as_nanos()).unwrap_or(u64::MAX);
        let prev = self.total_query_nanos.fetch_add(nanos, Ordering::Relaxed);
        if prev.checked_add(nanos).is_none() {
            self.total_query_nanos.store(u64::MAX, Ordering::Relaxed);
        }
    }
}

impl Observer for CountObserver {
    fn on_after(&self, call: &CallEnvelope<'_>) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if call.thrown.is_some() {
            self.failed_calls.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(execution) = &call.execution {
            self.count_execution(execution, call);
        }
    }
}

/// Which notification produced a [`RecordedCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// [`Observer::on_before`]
    Before,
    /// [`Observer::on_after`]
    After,
}

/// Owned copy of a [`CallEnvelope`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub phase: Phase,
    pub sequence: u64,
    pub connection_id: Option<String>,
    pub data_source_name: String,
    pub target: TargetKind,
    pub method: &'static str,
    pub args: Vec<Value>,
    pub execution: Option<ExecutionRecord>,
    pub elapsed: Duration,
    pub result: Option<CallResult>,
    pub error: Option<DbError>,
}

impl RecordedCall {
    fn capture(phase: Phase, call: &CallEnvelope<'_>) -> Self {
        Self {
            phase,
            sequence: call.sequence,
            connection_id: call.connection_id().map(str::to_string),
            data_source_name: call.data_source_name.to_string(),
            target: call.target,
            method: call.method,
            args: call.args.clone(),
            execution: call.execution.clone(),
            elapsed: call.elapsed,
            result: call.result.clone(),
            error: call.thrown.cloned(),
        }
    }
}

/// Keeps every notification in memory, for assertions and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedCall>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every notification, in the order received.
    pub fn events(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    /// Completed calls (after-notifications) in completion order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock()
            .iter()
            .filter(|e| e.phase == Phase::After)
            .cloned()
            .collect()
    }

    /// Completed calls of `method`.
    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.lock()
            .iter()
            .filter(|e| e.phase == Phase::After && e.method == method)
            .cloned()
            .collect()
    }

    /// Execution records of completed execute calls, in order.
    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.lock()
            .iter()
            .filter(|e| e.phase == Phase::After)
            .filter_map(|e| e.execution.clone())
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Observer for RecordingObserver {
    fn on_before(&self, call: &CallEnvelope<'_>) {
        self.lock().push(RecordedCall::capture(Phase::Before, call));
    }

    fn on_after(&self, call: &CallEnvelope<'_>) {
        self.lock().push(RecordedCall::capture(Phase::After, call));
    }
}
