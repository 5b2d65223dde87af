//! Connection identity shared by a logical connection and everything derived from it.

use crate::error::DbResult;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Identity and bookkeeping for one logical connection.
///
/// Created once when the connection is opened and shared by `Arc` with every
/// statement and result set obtained from it. The id and data source name never
/// change; the counters and the closed flag are updated by the connection proxy.
#[derive(Debug)]
pub struct ConnectionInfo {
    id: String,
    data_source_name: String,
    commit_count: AtomicU64,
    rollback_count: AtomicU64,
    closed: AtomicBool,
}

impl ConnectionInfo {
    /// Create connection info for an already generated id.
    pub fn new(id: impl Into<String>, data_source_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data_source_name: data_source_name.into(),
            commit_count: AtomicU64::new(0),
            rollback_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Connection id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the data source the connection came from.
    pub fn data_source_name(&self) -> &str {
        &self.data_source_name
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.commit_count.load(Ordering::Relaxed)
    }

    /// Number of successful rollbacks.
    pub fn rollback_count(&self) -> u64 {
        self.rollback_count.load(Ordering::Relaxed)
    }

    /// Whether the connection has been closed through its proxy.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn record_commit(&self) {
        self.commit_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollback_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Policy producing connection ids.
///
/// Chosen once when a [`ProxyConfig`](crate::ProxyConfig) is built. Ids must be
/// unique for the lifetime of the process; an error aborts connection open.
pub trait ConnectionIdGenerator: Send + Sync {
    /// Produce the id for a newly opened connection.
    fn next_id(&self) -> DbResult<String>;
}

impl<F> ConnectionIdGenerator for F
where
    F: Fn() -> DbResult<String> + Send + Sync,
{
    fn next_id(&self) -> DbResult<String> {
        self()
    }
}

/// Sequential ids (`"1"`, `"2"`, ...), counted per generator.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    last: AtomicU64,
}

impl SequentialIdGenerator {
    /// Create a generator whose first id is `"1"`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionIdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> DbResult<String> {
        let id = self.last.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(id.to_string())
    }
}

/// Random v4 UUID ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl ConnectionIdGenerator for UuidIdGenerator {
    fn next_id(&self) -> DbResult<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}
