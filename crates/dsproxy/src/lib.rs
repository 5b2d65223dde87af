//! # dsproxy
//!
//! Observable, rewritable proxies around database driver objects.
//!
//! ## Features
//!
//! - **Transparent wrappers**: proxied data sources, connections, statements and
//!   result sets implement the same [`driver`] traits as the objects they wrap
//! - **Observers**: every call is reported before and after it runs, with
//!   timing, arguments and outcome, including failures
//! - **Transformers**: query text and bound parameters can be rewritten or
//!   rejected before the driver sees them
//! - **Batch tracking**: queued batch entries are reported as a whole when the
//!   batch executes
//! - **Connection identity**: one id per logical connection, shared by every
//!   statement and result set derived from it
//!
//! ## Example
//!
//! ```ignore
//! use dsproxy::{
//!     Connection, CountObserver, DataSource, PreparedStatement, ProxyConfig,
//!     ProxyDataSource, TracingObserver, TransformAction, UuidIdGenerator,
//! };
//! use std::sync::Arc;
//!
//! let counter = Arc::new(CountObserver::new());
//! let config = ProxyConfig::new()
//!     .with_name("orders")
//!     .with_id_generator(UuidIdGenerator)
//!     .with_observer(TracingObserver::new())
//!     .with_observer_arc(counter.clone())
//!     .with_query_transformer(|ctx: &dsproxy::TransformContext<'_>| {
//!         TransformAction::Replace(format!("/* ds={} */ {}", ctx.data_source_name, ctx.query))
//!     });
//!
//! let ds = ProxyDataSource::new(real_data_source, config);
//! let conn = ds.get_connection().await?;
//! let mut stmt = conn.prepare_statement("SELECT * FROM orders WHERE id = ?").await?;
//! stmt.set_parameter(1.into(), 42.into())?;
//! let mut rows = stmt.execute_query().await?;
//! ```

pub mod driver;
pub mod error;
pub mod identity;
pub mod observer;
pub mod proxy;
pub mod sql;
pub mod transform;
pub mod value;

pub use driver::{
    CallableStatement, Connection, DataSource, PreparedStatement, ResultSet, Statement,
    StatementKind, TargetKind,
};
pub use error::{DbError, DbResult};
pub use identity::{ConnectionIdGenerator, ConnectionInfo, SequentialIdGenerator, UuidIdGenerator};
pub use observer::{
    CallEnvelope, CallResult, CompositeObserver, CountObserver, ExecutionRecord, NoopObserver,
    Observer, ObserverChain, Phase, QueryCounts, RecordedCall, RecordingObserver,
    TracingObserver,
};
pub use proxy::{
    BatchTracker, ProxiedCallableStatement, ProxiedConnection, ProxiedPreparedStatement,
    ProxiedResultSet, ProxiedStatement, ProxyConfig, ProxyDataSource, wrap_connection,
};
pub use sql::QueryType;
pub use transform::{
    CompositeParameterTransformer, CompositeQueryTransformer, NoopTransformer,
    ParameterTransformer, QueryTransformer, TransformAction, TransformContext,
};
pub use value::{ParameterKey, Parameters, QueryInfo, Value};
