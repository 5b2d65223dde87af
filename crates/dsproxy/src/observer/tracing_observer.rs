use super::types::{CallEnvelope, Observer};
use crate::sql::abbreviate_sql;
use tracing::Level;

/// A `tracing`-based observer emitting one event per completed call.
///
/// Successful calls are emitted at `level`, failed ones at `failure_level`.
/// Events use the `dsproxy.call` target with structured fields only.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Level for successful calls.
    pub level: Level,
    /// Level for calls whose real call failed.
    pub failure_level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Emit only calls that executed queries.
    pub queries_only: bool,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            failure_level: Level::WARN,
            max_sql_length: Some(200),
            queries_only: false,
        }
    }
}

impl TracingObserver {
    /// Create a new observer with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the level for successful calls.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Override the level for failed calls.
    pub fn failure_level(mut self, level: Level) -> Self {
        self.failure_level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Skip calls that did not execute a query.
    pub fn queries_only(mut self) -> Self {
        self.queries_only = true;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) => abbreviate_sql(sql, max).into_owned(),
            None => sql.to_string(),
        }
    }
}

impl Observer for TracingObserver {
    fn on_after(&self, call: &CallEnvelope<'_>) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        if self.queries_only && call.execution.is_none() {
            return;
        }

        let connection_id = call.connection_id().unwrap_or("-");
        let sql = call.query().map(|q| self.truncate_sql(q));
        let sql = sql.as_deref().unwrap_or("-");
        let batch_size = call.execution.as_ref().map_or(0, |e| e.batch_size());

        match call.thrown {
            Some(err) => emit_at_level!(
                self.failure_level,
                target: "dsproxy.call",
                seq = call.sequence,
                data_source = call.data_source_name,
                connection_id,
                target_kind = %call.target,
                method = call.method,
                elapsed = ?call.elapsed,
                batch_size,
                sql = %sql,
                error = %err,
                "call failed"
            ),
            None => emit_at_level!(
                self.level,
                target: "dsproxy.call",
                seq = call.sequence,
                data_source = call.data_source_name,
                connection_id,
                target_kind = %call.target,
                method = call.method,
                elapsed = ?call.elapsed,
                batch_size,
                sql = %sql,
                "call completed"
            ),
        }
    }
}
