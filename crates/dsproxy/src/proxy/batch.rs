use crate::driver::StatementKind;
use crate::observer::ExecutionRecord;
use crate::value::QueryInfo;

/// Batch entries queued on one statement since the last clear.
///
/// The entry count doubles as the batch counter: [`next_index`](Self::next_index)
/// is the zero-based index the next added entry will get.
#[derive(Debug, Clone, Default)]
pub struct BatchTracker {
    entries: Vec<QueryInfo>,
}

impl BatchTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next added entry will get.
    pub fn next_index(&self) -> usize {
        self.entries.len()
    }

    /// Queue an entry.
    pub fn push(&mut self, query: QueryInfo) {
        self.entries.push(query);
    }

    /// Drop every queued entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries in order.
    pub fn entries(&self) -> &[QueryInfo] {
        &self.entries
    }

    /// Execution record describing the whole queued batch.
    pub fn record(&self, statement: StatementKind) -> ExecutionRecord {
        ExecutionRecord::batch(statement, self.entries.clone())
    }
}
