use super::config::ProxyConfig;
use super::dispatch::{Call, Interceptor};
use super::prepared::ProxiedPreparedStatement;
use super::statement::ProxiedStatement;
use crate::driver::{Connection, StatementKind, TargetKind};
use crate::error::{DbError, DbResult};
use crate::identity::ConnectionInfo;
use crate::observer::CallResult;
use crate::transform::{TransformContext, rewrite_query};
use crate::value::Parameters;
use std::sync::Arc;

/// Connection wrapper.
///
/// Holds the [`ConnectionInfo`] shared by every statement and result set
/// obtained through it. Prepared and callable SQL goes through the query
/// transformer before the driver prepares it.
#[derive(Debug)]
pub struct ProxiedConnection<C> {
    inner: C,
    info: Arc<ConnectionInfo>,
    interceptor: Interceptor,
}

impl<C: Connection> ProxiedConnection<C> {
    /// Wrap `inner`, assigning a fresh id from the configured policy.
    ///
    /// Fails with [`DbError::Identity`] when the policy fails; `inner` is
    /// dropped in that case.
    pub fn wrap(inner: C, config: impl Into<Arc<ProxyConfig>>) -> DbResult<Self> {
        let config = config.into();
        let info = new_identity(&config)?;
        Ok(Self::with_info(inner, info, config))
    }

    /// Wrap `inner` with an identity supplied by the caller.
    pub fn with_info(
        inner: C,
        info: Arc<ConnectionInfo>,
        config: impl Into<Arc<ProxyConfig>>,
    ) -> Self {
        let interceptor =
            Interceptor::new(config.into(), Some(info.clone()), TargetKind::Connection);
        Self {
            inner,
            info,
            interceptor,
        }
    }

    /// Identity shared with derived objects.
    pub fn info(&self) -> &Arc<ConnectionInfo> {
        &self.info
    }

    /// Connection id.
    pub fn id(&self) -> &str {
        self.info.id()
    }

    pub fn config(&self) -> &Arc<ProxyConfig> {
        self.interceptor.config()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn rewrite(&self, kind: StatementKind, sql: &str) -> DbResult<String> {
        let params = Parameters::new();
        let ctx = TransformContext::new(kind, self.interceptor.data_source_name(), sql, &params);
        rewrite_query(self.interceptor.config().query_transformer(), &ctx)
    }
}

/// Identity for a newly opened connection, from the configured policy.
pub(crate) fn new_identity(config: &ProxyConfig) -> DbResult<Arc<ConnectionInfo>> {
    let id = config
        .id_generator()
        .next_id()
        .map_err(DbError::into_identity)?;
    let info = Arc::new(ConnectionInfo::new(id, config.name()));
    tracing::debug!(
        target: "dsproxy",
        connection_id = info.id(),
        data_source = config.name(),
        "connection opened"
    );
    Ok(info)
}

/// Wrap a real connection; see [`ProxiedConnection::wrap`].
pub fn wrap_connection<C: Connection>(
    inner: C,
    config: impl Into<Arc<ProxyConfig>>,
) -> DbResult<ProxiedConnection<C>> {
    ProxiedConnection::wrap(inner, config)
}

impl<C: Connection> Connection for ProxiedConnection<C> {
    type Statement = ProxiedStatement<C::Statement>;
    type Prepared = ProxiedPreparedStatement<C::Prepared>;
    type Callable = ProxiedPreparedStatement<C::Callable>;

    async fn create_statement(&self) -> DbResult<Self::Statement> {
        let statement = self
            .interceptor
            .invoke_async(
                Call::new("create_statement"),
                |_| CallResult::Created(TargetKind::Statement),
                || self.inner.create_statement(),
            )
            .await?;
        Ok(ProxiedStatement::from_parts(
            statement,
            self.interceptor.child(TargetKind::Statement),
        ))
    }

    async fn prepare_statement(&self, sql: &str) -> DbResult<Self::Prepared> {
        let sql = self.rewrite(StatementKind::Prepared, sql)?;
        let prepared = self
            .interceptor
            .invoke_async(
                Call::new("prepare_statement").arg(sql.as_str()),
                |_| CallResult::Created(TargetKind::PreparedStatement),
                || self.inner.prepare_statement(&sql),
            )
            .await?;
        Ok(ProxiedPreparedStatement::from_parts(
            prepared,
            StatementKind::Prepared,
            sql,
            self.interceptor.child(TargetKind::PreparedStatement),
        ))
    }

    async fn prepare_call(&self, sql: &str) -> DbResult<Self::Callable> {
        let sql = self.rewrite(StatementKind::Callable, sql)?;
        let callable = self
            .interceptor
            .invoke_async(
                Call::new("prepare_call").arg(sql.as_str()),
                |_| CallResult::Created(TargetKind::CallableStatement),
                || self.inner.prepare_call(&sql),
            )
            .await?;
        Ok(ProxiedPreparedStatement::from_parts(
            callable,
            StatementKind::Callable,
            sql,
            self.interceptor.child(TargetKind::CallableStatement),
        ))
    }

    async fn set_auto_commit(&self, auto_commit: bool) -> DbResult<()> {
        self.interceptor
            .invoke_async(
                Call::new("set_auto_commit").arg(auto_commit),
                |_| CallResult::Unit,
                || self.inner.set_auto_commit(auto_commit),
            )
            .await
    }

    async fn commit(&self) -> DbResult<()> {
        self.interceptor
            .invoke_async(Call::new("commit"), |_| CallResult::Unit, || self.inner.commit())
            .await?;
        self.info.record_commit();
        Ok(())
    }

    async fn rollback(&self) -> DbResult<()> {
        self.interceptor
            .invoke_async(Call::new("rollback"), |_| CallResult::Unit, || self.inner.rollback())
            .await?;
        self.info.record_rollback();
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        self.interceptor
            .invoke_async(Call::new("close"), |_| CallResult::Unit, || self.inner.close())
            .await?;
        self.info.mark_closed();
        tracing::debug!(
            target: "dsproxy",
            connection_id = self.info.id(),
            commits = self.info.commit_count(),
            rollbacks = self.info.rollback_count(),
            "connection closed"
        );
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.interceptor
            .invoke(
                Call::new("is_closed"),
                |closed: &bool| CallResult::Bool(*closed),
                || Ok(self.inner.is_closed()),
            )
            .unwrap_or(false)
    }
}
