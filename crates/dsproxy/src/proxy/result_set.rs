use super::config::ProxyConfig;
use super::dispatch::{Call, Interceptor};
use crate::driver::{ResultSet, StatementKind, TargetKind};
use crate::error::DbResult;
use crate::identity::ConnectionInfo;
use crate::observer::CallResult;
use crate::value::Value;
use std::sync::Arc;

/// Result set wrapper. Every call is observed; nothing is rewritten.
#[derive(Debug)]
pub struct ProxiedResultSet<R> {
    inner: R,
    interceptor: Interceptor,
    statement: StatementKind,
}

impl<R: ResultSet> ProxiedResultSet<R> {
    /// Wrap a result set produced by a statement of kind `statement`.
    pub fn wrap(
        inner: R,
        statement: StatementKind,
        connection: Arc<ConnectionInfo>,
        config: impl Into<Arc<ProxyConfig>>,
    ) -> Self {
        let interceptor =
            Interceptor::new(config.into(), Some(connection), TargetKind::ResultSet);
        Self::from_parts(inner, interceptor, statement)
    }

    pub(crate) fn from_parts(inner: R, interceptor: Interceptor, statement: StatementKind) -> Self {
        Self {
            inner,
            interceptor,
            statement,
        }
    }

    /// Kind of the statement that produced these rows.
    pub fn statement_kind(&self) -> StatementKind {
        self.statement
    }

    /// Identity of the owning connection.
    pub fn connection_info(&self) -> Option<&Arc<ConnectionInfo>> {
        self.interceptor.connection()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ResultSet> ResultSet for ProxiedResultSet<R> {
    async fn next(&mut self) -> DbResult<bool> {
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(Call::new("next"), |more: &bool| CallResult::Bool(*more), || inner.next())
            .await
    }

    fn get(&self, index: usize) -> DbResult<Value> {
        self.interceptor.invoke(
            Call::new("get").arg(index),
            |value: &Value| CallResult::Value(value.clone()),
            || self.inner.get(index),
        )
    }

    fn get_by_name(&self, column: &str) -> DbResult<Value> {
        self.interceptor.invoke(
            Call::new("get_by_name").arg(column),
            |value: &Value| CallResult::Value(value.clone()),
            || self.inner.get_by_name(column),
        )
    }

    async fn close(&mut self) -> DbResult<()> {
        let inner = &mut self.inner;
        self.interceptor
            .invoke_async(Call::new("close"), |_| CallResult::Unit, || inner.close())
            .await
    }
}
