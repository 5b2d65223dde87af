use super::batch::BatchTracker;
use super::config::ProxyConfig;
use super::dispatch::{Call, Interceptor};
use super::result_set::ProxiedResultSet;
use crate::driver::{Statement, StatementKind, TargetKind};
use crate::error::DbResult;
use crate::identity::ConnectionInfo;
use crate::observer::{CallResult, ExecutionRecord};
use crate::transform::{TransformContext, rewrite_query};
use crate::value::{Parameters, QueryInfo};
use std::sync::Arc;

/// Plain statement wrapper.
///
/// Query text passed to `execute*` and `add_batch` goes through the query
/// transformer first; batch entries are tracked so `execute_batch` can report
/// every queued query.
#[derive(Debug)]
pub struct ProxiedStatement<S> {
    inner: S,
    interceptor: Interceptor,
    batch: BatchTracker,
}

impl<S: Statement> ProxiedStatement<S> {
    /// Wrap a statement belonging to the connection identified by `connection`.
    pub fn wrap(
        inner: S,
        connection: Arc<ConnectionInfo>,
        config: impl Into<Arc<ProxyConfig>>,
    ) -> Self {
        let interceptor =
            Interceptor::new(config.into(), Some(connection), TargetKind::Statement);
        Self::from_parts(inner, interceptor)
    }

    pub(crate) fn from_parts(inner: S, interceptor: Interceptor) -> Self {
        Self {
            inner,
            interceptor,
            batch: BatchTracker::new(),
        }
    }

    /// Batch entries queued since the last clear.
    pub fn batch(&self) -> &BatchTracker {
        &self.batch
    }

    /// Identity of the owning connection.
    pub fn connection_info(&self) -> Option<&Arc<ConnectionInfo>> {
        self.interceptor.connection()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn rewrite(&self, sql: &str, batch_index: Option<usize>) -> DbResult<String> {
        let params = Parameters::new();
        let mut ctx = TransformContext::new(
            StatementKind::Statement,
            self.interceptor.data_source_name(),
            sql,
            &params,
        );
        if let Some(index) = batch_index {
            ctx = ctx.batch(index);
        }
        rewrite_query(self.interceptor.config().query_transformer(), &ctx)
    }

    fn wrap_rows(&self, rows: S::Rows) -> ProxiedResultSet<S::Rows> {
        ProxiedResultSet::from_parts(
            rows,
            self.interceptor.child(TargetKind::ResultSet),
            StatementKind::Statement,
        )
    }
}

fn execution_call(method: &'static str, sql: &str) -> Call {
    Call::new(method)
        .arg(sql)
        .execution(ExecutionRecord::single(StatementKind::Statement, QueryInfo::new(sql)))
}

impl<S: Statement> Statement for ProxiedStatement<S> {
    type Rows = ProxiedResultSet<S::Rows>;

    async fn execute(&mut self, sql: &str) -> DbResult<bool> {
        let sql = self.rewrite(sql, None)?;
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(
                execution_call("execute", &sql),
                |has_rows: &bool| CallResult::Bool(*has_rows),
                || inner.execute(&sql),
            )
            .await
    }

    async fn execute_query(&mut self, sql: &str) -> DbResult<Self::Rows> {
        let sql = self.rewrite(sql, None)?;
        let inner = &mut self.inner;
        let rows = self
            .interceptor
            .invoke_async(
                execution_call("execute_query", &sql),
                |_| CallResult::Created(TargetKind::ResultSet),
                || inner.execute_query(&sql),
            )
            .await?;
        Ok(self.wrap_rows(rows))
    }

    async fn execute_update(&mut self, sql: &str) -> DbResult<u64> {
        let sql = self.rewrite(sql, None)?;
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(
                execution_call("execute_update", &sql),
                |affected: &u64| CallResult::Affected(*affected),
                || inner.execute_update(&sql),
            )
            .await
    }

    fn add_batch(&mut self, sql: &str) -> DbResult<()> {
        let sql = self.rewrite(sql, Some(self.batch.next_index()))?;
        self.batch.push(QueryInfo::new(sql.as_str()));

        let inner = &mut self.inner;
        self.interceptor.invoke(
            Call::new("add_batch").arg(sql.as_str()),
            |_| CallResult::Unit,
            || inner.add_batch(&sql),
        )
    }

    fn clear_batch(&mut self) -> DbResult<()> {
        self.batch.clear();

        let inner = &mut self.inner;
        self.interceptor
            .invoke(Call::new("clear_batch"), |_| CallResult::Unit, || inner.clear_batch())
    }

    async fn execute_batch(&mut self) -> DbResult<Vec<u64>> {
        let call = Call::new("execute_batch").execution(self.batch.record(StatementKind::Statement));
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(
                call,
                |counts: &Vec<u64>| CallResult::BatchCounts(counts.clone()),
                || inner.execute_batch(),
            )
            .await
    }

    fn result_set(&mut self) -> DbResult<Option<Self::Rows>> {
        let inner = &mut self.inner;
        let rows = self.interceptor.invoke(
            Call::new("result_set"),
            |rows: &Option<S::Rows>| match rows {
                Some(_) => CallResult::Created(TargetKind::ResultSet),
                None => CallResult::Unit,
            },
            || inner.result_set(),
        )?;
        Ok(rows.map(|rows| self.wrap_rows(rows)))
    }

    async fn close(&mut self) -> DbResult<()> {
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(Call::new("close"), |_| CallResult::Unit, || inner.close())
            .await
    }
}
