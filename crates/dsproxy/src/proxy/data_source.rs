use super::config::ProxyConfig;
use super::connection::{ProxiedConnection, new_identity};
use super::dispatch::{Call, Interceptor};
use crate::driver::{Connection, DataSource, TargetKind};
use crate::error::DbResult;
use crate::observer::CallResult;
use std::sync::Arc;

/// Data source wrapper handing out [`ProxiedConnection`]s.
///
/// `get_connection` is itself observed, with target `DataSource` and no
/// connection identity yet.
#[derive(Debug)]
pub struct ProxyDataSource<D> {
    inner: D,
    interceptor: Interceptor,
}

impl<D: DataSource> ProxyDataSource<D> {
    pub fn new(inner: D, config: impl Into<Arc<ProxyConfig>>) -> Self {
        Self {
            inner,
            interceptor: Interceptor::new(config.into(), None, TargetKind::DataSource),
        }
    }

    pub fn config(&self) -> &Arc<ProxyConfig> {
        self.interceptor.config()
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DataSource> DataSource for ProxyDataSource<D> {
    type Connection = ProxiedConnection<D::Connection>;

    async fn get_connection(&self) -> DbResult<Self::Connection> {
        let connection = self
            .interceptor
            .invoke_async(
                Call::new("get_connection"),
                |_| CallResult::Created(TargetKind::Connection),
                || self.inner.get_connection(),
            )
            .await?;

        let config = self.interceptor.config();
        let info = match new_identity(config) {
            Ok(info) => info,
            Err(err) => {
                if let Err(close_err) = connection.close().await {
                    tracing::warn!(
                        target: "dsproxy",
                        error = %close_err,
                        "failed to close connection after identity failure"
                    );
                }
                return Err(err);
            }
        };
        Ok(ProxiedConnection::with_info(connection, info, config.clone()))
    }
}
