use super::batch::BatchTracker;
use super::config::ProxyConfig;
use super::dispatch::{Call, Interceptor};
use super::result_set::ProxiedResultSet;
use crate::driver::{CallableStatement, PreparedStatement, StatementKind, TargetKind};
use crate::error::DbResult;
use crate::identity::ConnectionInfo;
use crate::observer::{CallResult, ExecutionRecord};
use crate::transform::{TransformContext, rewrite_parameters};
use crate::value::{ParameterKey, Parameters, QueryInfo, Value};
use std::sync::Arc;

/// Prepared or callable statement wrapper.
///
/// Remembers the prepared query text and every binding made through it. When
/// the statement is executed or batched, the bindings go through the parameter
/// transformer; a replaced set is re-bound on the real statement before the
/// real call so the driver sees exactly what observers see.
#[derive(Debug)]
pub struct ProxiedPreparedStatement<P> {
    inner: P,
    interceptor: Interceptor,
    kind: StatementKind,
    query: String,
    parameters: Parameters,
    batch: BatchTracker,
}

/// Callable statements share the prepared wrapper; the callable-only calls are
/// available when the wrapped statement is a [`CallableStatement`].
pub type ProxiedCallableStatement<P> = ProxiedPreparedStatement<P>;

impl<P: PreparedStatement> ProxiedPreparedStatement<P> {
    /// Wrap a statement prepared from `query` (the text the driver received).
    pub fn wrap(
        inner: P,
        kind: StatementKind,
        query: impl Into<String>,
        connection: Arc<ConnectionInfo>,
        config: impl Into<Arc<ProxyConfig>>,
    ) -> Self {
        let interceptor = Interceptor::new(config.into(), Some(connection), kind.target());
        Self::from_parts(inner, kind, query.into(), interceptor)
    }

    pub(crate) fn from_parts(
        inner: P,
        kind: StatementKind,
        query: String,
        interceptor: Interceptor,
    ) -> Self {
        Self {
            inner,
            interceptor,
            kind,
            query,
            parameters: Parameters::new(),
            batch: BatchTracker::new(),
        }
    }

    /// Prepared query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current bindings, as last sent to the driver.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Statement flavour.
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Batch entries queued since the last clear.
    pub fn batch(&self) -> &BatchTracker {
        &self.batch
    }

    /// Identity of the owning connection.
    pub fn connection_info(&self) -> Option<&Arc<ConnectionInfo>> {
        self.interceptor.connection()
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    /// Run the parameter transformer and re-bind the real statement if it
    /// replaced the bindings.
    fn transform_parameters(&mut self, batch_index: Option<usize>) -> DbResult<()> {
        let replaced = {
            let mut ctx = TransformContext::new(
                self.kind,
                self.interceptor.data_source_name(),
                &self.query,
                &self.parameters,
            );
            if let Some(index) = batch_index {
                ctx = ctx.batch(index);
            }
            rewrite_parameters(self.interceptor.config().parameter_transformer(), &ctx)?
        };

        // Tracked bindings follow each real call so a failed re-bind leaves
        // them matching what the driver holds.
        if let Some(parameters) = replaced {
            self.inner.clear_parameters()?;
            self.parameters.clear();
            for (key, value) in parameters.iter() {
                self.inner.set_parameter(key.clone(), value.clone())?;
                self.parameters.set(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn current_query(&self) -> QueryInfo {
        QueryInfo::new(self.query.as_str()).with_parameters(self.parameters.clone())
    }

    fn execution_call(&self, method: &'static str) -> Call {
        Call::new(method).execution(ExecutionRecord::single(self.kind, self.current_query()))
    }
}

impl<P: PreparedStatement> PreparedStatement for ProxiedPreparedStatement<P> {
    type Rows = ProxiedResultSet<P::Rows>;

    fn set_parameter(&mut self, key: ParameterKey, value: Value) -> DbResult<()> {
        let call = Call::new("set_parameter").arg(&key).arg(value.clone());
        let inner = &mut self.inner;
        self.interceptor.invoke(call, |_| CallResult::Unit, || {
            inner.set_parameter(key.clone(), value.clone())
        })?;
        self.parameters.set(key, value);
        Ok(())
    }

    fn clear_parameters(&mut self) -> DbResult<()> {
        let inner = &mut self.inner;
        self.interceptor.invoke(
            Call::new("clear_parameters"),
            |_| CallResult::Unit,
            || inner.clear_parameters(),
        )?;
        self.parameters.clear();
        Ok(())
    }

    async fn execute(&mut self) -> DbResult<bool> {
        self.transform_parameters(None)?;
        let call = self.execution_call("execute");
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(call, |has_rows: &bool| CallResult::Bool(*has_rows), || inner.execute())
            .await
    }

    async fn execute_query(&mut self) -> DbResult<Self::Rows> {
        self.transform_parameters(None)?;
        let call = self.execution_call("execute_query");
        let inner = &mut self.inner;
        let rows = self
            .interceptor
            .invoke_async(
                call,
                |_| CallResult::Created(TargetKind::ResultSet),
                || inner.execute_query(),
            )
            .await?;
        Ok(ProxiedResultSet::from_parts(
            rows,
            self.interceptor.child(TargetKind::ResultSet),
            self.kind,
        ))
    }

    async fn execute_update(&mut self) -> DbResult<u64> {
        self.transform_parameters(None)?;
        let call = self.execution_call("execute_update");
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(
                call,
                |affected: &u64| CallResult::Affected(*affected),
                || inner.execute_update(),
            )
            .await
    }

    fn add_batch(&mut self) -> DbResult<()> {
        self.transform_parameters(Some(self.batch.next_index()))?;
        let entry = self.current_query();
        self.batch.push(entry);

        let inner = &mut self.inner;
        self.interceptor
            .invoke(Call::new("add_batch"), |_| CallResult::Unit, || inner.add_batch())
    }

    fn clear_batch(&mut self) -> DbResult<()> {
        self.batch.clear();

        let inner = &mut self.inner;
        self.interceptor
            .invoke(Call::new("clear_batch"), |_| CallResult::Unit, || inner.clear_batch())
    }

    async fn execute_batch(&mut self) -> DbResult<Vec<u64>> {
        let call = Call::new("execute_batch").execution(self.batch.record(self.kind));
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(
                call,
                |counts: &Vec<u64>| CallResult::BatchCounts(counts.clone()),
                || inner.execute_batch(),
            )
            .await
    }

    async fn close(&mut self) -> DbResult<()> {
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(Call::new("close"), |_| CallResult::Unit, || inner.close())
            .await
    }
}

impl<P: CallableStatement> CallableStatement for ProxiedPreparedStatement<P> {
    fn register_out_parameter(&mut self, key: ParameterKey, sql_type: &str) -> DbResult<()> {
        let call = Call::new("register_out_parameter").arg(&key).arg(sql_type);
        let inner = &mut self.inner;
        self.interceptor.invoke(call, |_| CallResult::Unit, || {
            inner.register_out_parameter(key, sql_type)
        })
    }

    fn out_parameter(&self, key: &ParameterKey) -> DbResult<Value> {
        self.interceptor.invoke(
            Call::new("out_parameter").arg(key),
            |value: &Value| CallResult::Value(value.clone()),
            || self.inner.out_parameter(key),
        )
    }
}
